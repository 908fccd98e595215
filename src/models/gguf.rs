use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt};

use super::ImportError;

/// The magic number that identifies GGUF files
pub const GGUF_MAGIC: u32 = 0x46554747; // "GGUF" in ASCII

/// Fixed-size header at the start of every GGUF file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GgufHeader {
    pub version: u32,
    pub tensor_count: u64,
    pub metadata_kv_count: u64,
}

/// Checks if a file at the given path is a GGUF format file by verifying its magic number.
///
/// `true` if the file exists and has a valid GGUF magic number, `false` otherwise
pub fn is_gguf_file<P: AsRef<Path>>(path: P) -> bool {
    if let Ok(mut file) = File::open(path) {
        if let Ok(magic) = file.read_u32::<LittleEndian>() {
            return magic == GGUF_MAGIC;
        }
    }
    false
}

const LFS_POINTER_PREFIX: &[u8] = b"version https://git-lfs.github.com/spec/";

/// True for a Git LFS pointer file, i.e. a model that was cloned without
/// `git lfs pull`.
pub fn is_lfs_pointer<P: AsRef<Path>>(path: P) -> bool {
    let mut prefix = [0u8; LFS_POINTER_PREFIX.len()];
    match File::open(path) {
        Ok(mut file) => file.read_exact(&mut prefix).is_ok() && &prefix[..] == LFS_POINTER_PREFIX,
        Err(_) => false,
    }
}

/// Reads the header. Version 1 stores the counts as u32, later versions as u64.
pub fn read_header<P: AsRef<Path>>(path: P) -> Result<GgufHeader, ImportError> {
    let path = path.as_ref();
    let mut reader = BufReader::new(File::open(path)?);
    parse_header(&mut reader).map_err(|e| match e {
        ImportError::Io(io) if io.kind() == std::io::ErrorKind::UnexpectedEof => {
            ImportError::NotGguf(path.to_path_buf())
        }
        ImportError::NotGguf(_) => ImportError::NotGguf(path.to_path_buf()),
        other => other,
    })
}

fn parse_header<R: Read>(reader: &mut R) -> Result<GgufHeader, ImportError> {
    let magic = reader.read_u32::<LittleEndian>()?;
    if magic != GGUF_MAGIC {
        return Err(ImportError::NotGguf(Default::default()));
    }

    let version = reader.read_u32::<LittleEndian>()?;
    let (tensor_count, metadata_kv_count) = if version >= 2 {
        (reader.read_u64::<LittleEndian>()?, reader.read_u64::<LittleEndian>()?)
    } else {
        (
            reader.read_u32::<LittleEndian>()? as u64,
            reader.read_u32::<LittleEndian>()? as u64,
        )
    };

    Ok(GgufHeader {
        version,
        tensor_count,
        metadata_kv_count,
    })
}
