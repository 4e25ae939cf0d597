//! Reading and writing meshes in the OMSH binary format.
//!
//! An OMSH file is a sequence of little-endian 32-bit words:
//!
//! ```text
//! magic ('OMSH')
//! number of vertices
//! vertex stride in bytes
//! number of indices
//! index size in bytes (2 or 4)
//! number of vertex attributes
//! number of primitive groups
//! (attribute code, format code) for each vertex attribute
//! (primitive type code, base element, number of elements) for each group
//! vertex data
//! index data, padded with two bytes if needed to fill a whole word
//! ```

use crate::{
    IndexType, MAX_PRIMITIVE_GROUPS, MeshSetup, PrimitiveGroup, PrimitiveType, VertexAttr,
    VertexComponent, VertexFormat,
};
use anyhow::{Result, anyhow, bail};

/// The first word of every OMSH file.
pub const MAGIC: u32 = u32::from_be_bytes(*b"OMSH");

const HEADER_WORDS: u64 = 7;
const ATTRIBUTE_WORDS: u64 = 2;
const GROUP_WORDS: u64 = 3;

/// Fills in the given setup from the OMSH data in `bytes`.
///
/// The layout, counts, index type, primitive type, primitive groups and data
/// offsets of the setup are set. The vertex and index data stay in `bytes`,
/// at the recorded offsets.
///
/// # Errors
/// Returns an error if the data is not a complete, well-formed OMSH file. On
/// error the setup may have been partially filled in.
///
/// # Panics
/// If the setup already has vertex components or primitive groups.
pub fn parse(bytes: &[u8], setup: &mut MeshSetup) -> Result<()> {
    assert!(
        setup.layout.is_empty() && setup.n_primitive_groups() == 0,
        "OMSH data must be parsed into a setup without layout or primitive groups"
    );

    if bytes.len() % 4 != 0 {
        bail!("OMSH data size {} is not a multiple of 4", bytes.len());
    }

    let mut reader = WordReader::new(bytes);

    let mut required_words = HEADER_WORDS;
    reader.require(required_words, "header")?;

    let magic = reader.next_word()?;
    if magic != MAGIC {
        bail!("Invalid OMSH magic {magic:#010x}");
    }

    setup.n_vertices = reader.next_word()?;
    let vertex_stride = reader.next_word()?;
    setup.n_indices = reader.next_word()?;

    let index_size = reader.next_word()?;
    setup.index_type = match index_size {
        2 => IndexType::Index16,
        4 => IndexType::Index32,
        _ => bail!("Invalid OMSH index size {index_size}"),
    };

    let n_attributes = reader.next_word()?;
    if n_attributes as usize > VertexAttr::COUNT {
        bail!(
            "OMSH data has {n_attributes} vertex attributes (max {})",
            VertexAttr::COUNT
        );
    }

    let n_groups = reader.next_word()?;
    if n_groups as usize > MAX_PRIMITIVE_GROUPS {
        bail!("OMSH data has {n_groups} primitive groups (max {MAX_PRIMITIVE_GROUPS})");
    }

    required_words += u64::from(n_attributes) * ATTRIBUTE_WORDS;
    reader.require(required_words, "vertex attributes")?;

    for _ in 0..n_attributes {
        let attr = VertexAttr::from_code(reader.next_word()?)?;
        let format = VertexFormat::from_code(reader.next_word()?)?;
        if setup.layout.contains(attr) {
            bail!("OMSH data has more than one {attr} attribute");
        }
        setup.layout.add_component(VertexComponent::new(attr, format));
    }

    required_words += u64::from(n_groups) * GROUP_WORDS;
    reader.require(required_words, "primitive groups")?;

    for group_idx in 0..n_groups {
        let primitive_type_code = reader.next_word()?;
        // The first group decides the primitive type of the whole mesh
        if group_idx == 0 {
            setup.primitive_type = PrimitiveType::from_code(primitive_type_code)?;
        }
        let base_element = reader.next_word()?;
        let n_elements = reader.next_word()?;
        setup.add_primitive_group(PrimitiveGroup::new(base_element, n_elements));
    }

    let vertex_data_size = u64::from(setup.n_vertices) * u64::from(vertex_stride);
    if vertex_data_size % 4 != 0 {
        bail!("OMSH vertex data size {vertex_data_size} is not a multiple of 4");
    }
    required_words += vertex_data_size / 4;
    reader.require(required_words, "vertex data")?;
    setup.data_vertex_offset = reader.byte_offset();
    reader.skip_words(vertex_data_size / 4);

    let mut index_data_size = u64::from(setup.n_indices) * u64::from(index_size);
    if index_data_size % 4 != 0 {
        index_data_size += 2;
    }
    required_words += index_data_size / 4;
    reader.require(required_words, "index data")?;
    setup.data_index_offset = reader.byte_offset();
    reader.skip_words(index_data_size / 4);

    if !reader.at_end() {
        bail!(
            "OMSH data has {} trailing bytes",
            bytes.len() - reader.byte_offset()
        );
    }

    Ok(())
}

/// Encodes the given setup together with its vertex and index data as OMSH
/// data.
///
/// All primitive groups are written with the setup's primitive type.
///
/// # Panics
/// - If the setup has no index type.
/// - If the data sizes do not match the counts and formats in the setup.
/// - If the vertex data size is not a multiple of 4.
pub fn write(setup: &MeshSetup, vertex_data: &[u8], index_data: &[u8]) -> Vec<u8> {
    assert_ne!(
        setup.index_type,
        IndexType::None,
        "OMSH data must have an index type"
    );
    assert_eq!(vertex_data.len(), setup.vertex_data_size());
    assert_eq!(index_data.len(), setup.index_data_size());
    assert_eq!(vertex_data.len() % 4, 0);

    let padding = index_data.len() % 4;
    let n_words = HEADER_WORDS as usize
        + setup.layout.n_components() * ATTRIBUTE_WORDS as usize
        + setup.n_primitive_groups() * GROUP_WORDS as usize;

    let mut bytes =
        Vec::with_capacity(n_words * 4 + vertex_data.len() + index_data.len() + padding);

    let mut push_word = |word: u32| bytes.extend_from_slice(&word.to_le_bytes());

    push_word(MAGIC);
    push_word(setup.n_vertices);
    push_word(setup.layout.byte_size() as u32);
    push_word(setup.n_indices);
    push_word(setup.index_type.byte_size() as u32);
    push_word(setup.layout.n_components() as u32);
    push_word(setup.n_primitive_groups() as u32);

    for component in setup.layout.components() {
        push_word(component.attr.code());
        push_word(component.format.code());
    }

    for group in setup.primitive_groups() {
        push_word(setup.primitive_type.code());
        push_word(group.base_element);
        push_word(group.n_elements);
    }

    bytes.extend_from_slice(vertex_data);
    bytes.extend_from_slice(index_data);
    bytes.resize(bytes.len() + padding, 0);

    bytes
}

#[derive(Debug)]
struct WordReader<'a> {
    bytes: &'a [u8],
    word_idx: usize,
}

impl<'a> WordReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, word_idx: 0 }
    }

    fn n_words(&self) -> u64 {
        (self.bytes.len() / 4) as u64
    }

    fn require(&self, n_required_words: u64, section: &str) -> Result<()> {
        if n_required_words > self.n_words() {
            bail!(
                "OMSH data too short for {section} ({} words, need {n_required_words})",
                self.n_words()
            );
        }
        Ok(())
    }

    fn next_word(&mut self) -> Result<u32> {
        let start = self.byte_offset();
        let word = self
            .bytes
            .get(start..start + 4)
            .ok_or_else(|| anyhow!("Unexpected end of OMSH data at byte {start}"))?;
        self.word_idx += 1;
        Ok(u32::from_le(bytemuck::pod_read_unaligned(word)))
    }

    /// Only called after [`Self::require`] has confirmed the words exist.
    fn skip_words(&mut self, n_words: u64) {
        self.word_idx += n_words as usize;
    }

    fn byte_offset(&self) -> usize {
        self.word_idx * 4
    }

    fn at_end(&self) -> bool {
        self.byte_offset() == self.bytes.len()
    }
}
