use std::{fs, path::Path};

use serde::{de::DeserializeOwned, Serialize};

use crate::{errors::Result, runtime::FieldBatch};

pub mod simple;

pub use simple::{StoredBatch, StoredField, StoredReport};

pub fn load_json<T, P>(path: P) -> Result<T>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let bytes = fs::read(path)?;
    let value = serde_json::from_slice(&bytes)?;
    Ok(value)
}

pub fn write_json<T, P>(path: P, value: &T) -> Result<()>
where
    T: Serialize,
    P: AsRef<Path>,
{
    let bytes = serde_json::to_vec_pretty(value)?;
    fs::write(path, bytes)?;
    Ok(())
}

/// Read a [`StoredBatch`] from JSON and rebuild its arrays.
pub fn load_batch<P: AsRef<Path>>(path: P) -> Result<FieldBatch> {
    let stored: StoredBatch = load_json(path)?;
    FieldBatch::try_from(stored)
}
