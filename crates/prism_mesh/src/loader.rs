//! Asynchronous loading of OMSH mesh files.

use crate::{MeshSetup, MeshSource, omsh};
use anyhow::{Result, anyhow};
use prism_io::{IoQueue, IoRequest, IoStatus};
use prism_resource::{
    AsyncResourceFactory, Locator, ResourceId, ResourceLabel, ResourceLoader, ResourceState,
};
use std::{fmt, sync::Arc};

/// Callback invoked with the parsed setup of a loaded mesh before the mesh
/// is created, for adjusting usage or similar settings.
pub type OnMeshLoaded = Box<dyn FnMut(&mut MeshSetup)>;

/// Loads an OMSH mesh file through an [`IoQueue`] and creates the mesh from
/// it once the data has arrived.
///
/// The loader is started by a
/// [`ResourceContainer`](prism_resource::ResourceContainer), which then polls
/// it every frame. Polling never blocks.
pub struct MeshLoader {
    setup: MeshSetup,
    io: IoQueue,
    id: ResourceId,
    io_request: Option<Arc<IoRequest>>,
    on_loaded: Option<OnMeshLoaded>,
    state: MeshLoaderState,
}

/// The progress of a [`MeshLoader`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MeshLoaderState {
    /// The loader has not been started.
    Created,
    /// The file has been requested and the mesh slot is pending.
    Pending,
    /// Loading has finished, leaving the mesh in the given state.
    Resolved(ResourceState),
    /// Loading was abandoned.
    Cancelled,
}

impl MeshLoader {
    /// Creates a loader for the mesh described by the given setup.
    ///
    /// # Panics
    /// If the setup is not for loading from a file, or its locator has no
    /// location.
    pub fn new(setup: MeshSetup, io: IoQueue) -> Self {
        assert_eq!(
            setup.source,
            MeshSource::File,
            "Mesh loader needs a setup for loading from file"
        );
        assert!(
            setup.locator.has_location(),
            "Mesh loader needs a locator with a location"
        );
        Self {
            setup,
            io,
            id: ResourceId::invalid(),
            io_request: None,
            on_loaded: None,
            state: MeshLoaderState::Created,
        }
    }

    /// Sets a callback invoked with the parsed setup before the mesh is
    /// created.
    pub fn with_on_loaded(mut self, on_loaded: impl FnMut(&mut MeshSetup) + 'static) -> Self {
        self.on_loaded = Some(Box::new(on_loaded));
        self
    }

    pub fn setup(&self) -> &MeshSetup {
        &self.setup
    }

    /// Returns the ID of the mesh being loaded, or the invalid ID if the
    /// loader has not been started.
    pub fn id(&self) -> ResourceId {
        self.id
    }

    pub fn state(&self) -> MeshLoaderState {
        self.state
    }

    /// Whether the loader still holds on to its IO request.
    pub fn has_io_request(&self) -> bool {
        self.io_request.is_some()
    }

    fn build_setup(&mut self, data: &[u8]) -> Result<MeshSetup> {
        let mut setup = MeshSetup::from_data_with_blueprint(&self.setup);
        setup.layout.clear();
        setup.clear_primitive_groups();

        prism_log::with_timing_debug_logging!(
            "Parsing mesh {}", self.setup.locator;
            omsh::parse(data, &mut setup)
        )?;

        if let Some(on_loaded) = &mut self.on_loaded {
            on_loaded(&mut setup);
        }
        Ok(setup)
    }

    fn resolve<P>(&mut self, pools: &mut P, request: &IoRequest) -> ResourceState
    where
        P: AsyncResourceFactory<MeshSetup> + ?Sized,
    {
        let loaded = match request.status() {
            IoStatus::Ok => request
                .take_data()
                .ok_or_else(|| anyhow!("IO request returned no data")),
            status => Err(anyhow!(
                "IO request {status:?}: {}",
                request.error_message().unwrap_or_default()
            )),
        };

        match loaded.and_then(|data| Ok((self.build_setup(&data)?, data))) {
            Ok((setup, data)) => {
                prism_log::debug!(
                    "Loaded mesh {} ({} vertices, {} indices)",
                    self.setup.locator,
                    setup.n_vertices,
                    setup.n_indices
                );
                pools.init_async(self.id, &setup, &data)
            }
            Err(error) => {
                prism_log::warn!("Failed to load mesh {}: {error:#}", self.setup.locator);
                pools.failed_async(self.id)
            }
        }
    }
}

impl<P> ResourceLoader<P> for MeshLoader
where
    P: AsyncResourceFactory<MeshSetup> + ?Sized,
{
    fn locator(&self) -> &Locator {
        &self.setup.locator
    }

    /// # Panics
    /// If the loader has already been started.
    fn start(&mut self, pools: &mut P, label: ResourceLabel) -> ResourceId {
        assert_eq!(
            self.state,
            MeshLoaderState::Created,
            "Mesh loader started twice"
        );

        self.id = pools.prepare_async(&self.setup, label);

        let request = Arc::new(IoRequest::new(
            self.setup.locator.location(),
            self.setup.io_lane,
        ));
        self.io.submit(Arc::clone(&request));
        self.io_request = Some(request);
        self.state = MeshLoaderState::Pending;

        self.id
    }

    fn continue_loading(&mut self, pools: &mut P) -> ResourceState {
        match self.state {
            MeshLoaderState::Resolved(state) => return state,
            MeshLoaderState::Cancelled | MeshLoaderState::Created => {
                return ResourceState::Invalid;
            }
            MeshLoaderState::Pending => {}
        }

        let Some(request) = self.io_request.take_if(|request| request.handled()) else {
            return ResourceState::Pending;
        };

        let state = self.resolve(pools, &request);
        self.state = MeshLoaderState::Resolved(state);
        state
    }

    fn cancel(&mut self) {
        match self.state {
            MeshLoaderState::Created | MeshLoaderState::Pending => {
                if let Some(request) = self.io_request.take() {
                    request.set_cancelled();
                }
                prism_log::debug!("Cancelled loading mesh {}", self.setup.locator);
                self.state = MeshLoaderState::Cancelled;
            }
            MeshLoaderState::Resolved(_) | MeshLoaderState::Cancelled => {}
        }
    }
}

impl fmt::Debug for MeshLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MeshLoader")
            .field("locator", &self.setup.locator)
            .field("id", &self.id)
            .field("state", &self.state)
            .field("io_request", &self.io_request)
            .field("has_on_loaded", &self.on_loaded.is_some())
            .finish_non_exhaustive()
    }
}
