//! Fragment file header definitions
//!
//! A fragment file is one fixed-size [`FragmentHeader`] followed by
//! `tile_count` tiles. Each tile is a fixed-size [`TileHeader`] followed by
//! three filtered column blobs (dim0, dim1, values) of the sizes it records.

use super::constants::fragment::{HEADER_SIZE, MAGIC, TILE_HEADER_SIZE, VERSION};
use super::schema::{DataType, Layout};
use crate::{Result, SomaError};

fn read_u64(bytes: &[u8], at: usize) -> u64 {
    u64::from_le_bytes([
        bytes[at],
        bytes[at + 1],
        bytes[at + 2],
        bytes[at + 3],
        bytes[at + 4],
        bytes[at + 5],
        bytes[at + 6],
        bytes[at + 7],
    ])
}

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

/// Fixed-size header at the start of every fragment file (32 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FragmentHeader {
    /// Magic bytes: "SFRG"
    pub magic: [u8; 4],
    /// Format version
    pub version: u8,
    /// Value attribute type
    pub data_type: DataType,
    /// Order cells were sorted in before tiling
    pub cell_order: Layout,
    /// Total cells across all tiles
    pub cell_count: u64,
    /// Number of tiles following the header
    pub tile_count: u32,
}

impl FragmentHeader {
    pub const SIZE: usize = HEADER_SIZE;

    pub const fn new(data_type: DataType, cell_order: Layout, cell_count: u64, tile_count: u32) -> Self {
        Self {
            magic: MAGIC,
            version: VERSION,
            data_type,
            cell_order,
            cell_count,
            tile_count,
        }
    }

    /// Parse header from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < Self::SIZE {
            return Err(SomaError::InvalidFragment("fragment header truncated"));
        }
        if bytes[0..4] != MAGIC {
            return Err(SomaError::InvalidFragment("bad fragment magic"));
        }
        let version = bytes[4];
        if version > VERSION {
            return Err(SomaError::InvalidFragment("unsupported fragment version"));
        }
        let data_type = DataType::from_u8(bytes[5])
            .ok_or(SomaError::InvalidFragment("unknown fragment data type"))?;
        let cell_order = match bytes[6] {
            0 => Layout::RowMajor,
            1 => Layout::ColMajor,
            _ => return Err(SomaError::InvalidFragment("unknown fragment cell order")),
        };

        Ok(Self {
            magic: MAGIC,
            version,
            data_type,
            cell_order,
            cell_count: read_u64(bytes, 8),
            tile_count: read_u32(bytes, 16),
        })
    }

    /// Convert to bytes; reserved bytes are zero
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];
        bytes[0..4].copy_from_slice(&self.magic);
        bytes[4] = self.version;
        bytes[5] = self.data_type.to_u8();
        bytes[6] = match self.cell_order {
            Layout::RowMajor => 0,
            Layout::ColMajor => 1,
        };
        bytes[8..16].copy_from_slice(&self.cell_count.to_le_bytes());
        bytes[16..20].copy_from_slice(&self.tile_count.to_le_bytes());
        bytes
    }
}

/// Fixed-size header preceding each tile (32 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TileHeader {
    /// Cells stored in this tile
    pub cell_count: u64,
    /// Filtered size of the dim0 column
    pub dim0_size: u64,
    /// Filtered size of the dim1 column
    pub dim1_size: u64,
    /// Filtered size of the values column
    pub values_size: u64,
}

impl TileHeader {
    pub const SIZE: usize = TILE_HEADER_SIZE;

    /// Parse tile header from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < Self::SIZE {
            return Err(SomaError::InvalidFragment("tile header truncated"));
        }
        Ok(Self {
            cell_count: read_u64(bytes, 0),
            dim0_size: read_u64(bytes, 8),
            dim1_size: read_u64(bytes, 16),
            values_size: read_u64(bytes, 24),
        })
    }

    pub fn to_bytes(&self) -> [u8; TILE_HEADER_SIZE] {
        let mut bytes = [0u8; TILE_HEADER_SIZE];
        bytes[0..8].copy_from_slice(&self.cell_count.to_le_bytes());
        bytes[8..16].copy_from_slice(&self.dim0_size.to_le_bytes());
        bytes[16..24].copy_from_slice(&self.dim1_size.to_le_bytes());
        bytes[24..32].copy_from_slice(&self.values_size.to_le_bytes());
        bytes
    }

    /// Total payload bytes following this header, with overflow protection
    pub fn payload_size(&self) -> Result<usize> {
        self.dim0_size
            .checked_add(self.dim1_size)
            .and_then(|s| s.checked_add(self.values_size))
            .and_then(|s| usize::try_from(s).ok())
            .ok_or(SomaError::InvalidFragment("tile payload size overflow"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fragment_header_bytes() {
        let header = FragmentHeader::new(DataType::F64, Layout::ColMajor, 12345, 7);
        let bytes = header.to_bytes();
        assert_eq!(&bytes[0..4], b"SFRG");
        assert_eq!(FragmentHeader::from_bytes(&bytes).unwrap(), header);
    }

    #[test]
    fn test_fragment_header_rejects_garbage() {
        let mut bytes = FragmentHeader::new(DataType::F32, Layout::RowMajor, 1, 1).to_bytes();
        assert!(FragmentHeader::from_bytes(&bytes[..10]).is_err());

        bytes[5] = 99;
        assert!(matches!(
            FragmentHeader::from_bytes(&bytes),
            Err(SomaError::InvalidFragment("unknown fragment data type"))
        ));

        bytes[0] = b'X';
        assert!(matches!(
            FragmentHeader::from_bytes(&bytes),
            Err(SomaError::InvalidFragment("bad fragment magic"))
        ));
    }

    #[test]
    fn test_tile_payload_overflow() {
        let tile = TileHeader {
            cell_count: 1,
            dim0_size: u64::MAX,
            dim1_size: 1,
            values_size: 0,
        };
        assert!(tile.payload_size().is_err());
    }
}
