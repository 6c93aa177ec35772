//! The `.dsc` file: block size, block group size, and the direct
//! dependency's basename, if any.

use std::io::{Read, Write};

use crate::error::StoreError;

#[derive(Debug, Clone)]
pub struct Descriptor {
    pub block_size: u32,
    pub group_size: u32,
    pub dep_basename: Option<String>,
}

impl Descriptor {
    pub fn write<W: Write>(&self, w: &mut W) -> Result<(), StoreError> {
        write!(w, "{} {}\n", self.block_size, self.group_size)?;
        if let Some(dep) = &self.dep_basename {
            w.write_all(dep.as_bytes())?;
        }
        Ok(())
    }

    pub fn read<R: Read>(r: &mut R) -> Result<Self, StoreError> {
        let mut raw = String::new();
        r.read_to_string(&mut raw)
            .map_err(|e| StoreError::Format(format!("descriptor is not valid UTF-8: {e}")))?;

        let nl = raw
            .find('\n')
            .ok_or_else(|| StoreError::Format("descriptor missing header line".into()))?;
        let header = &raw[..nl];
        let remainder = &raw[nl + 1..];

        let mut parts = header.split_whitespace();
        let block_size: u32 = parts
            .next()
            .ok_or_else(|| StoreError::Format("descriptor missing block_size".into()))?
            .parse()
            .map_err(|_| StoreError::Format("descriptor block_size is not an integer".into()))?;
        let group_size: u32 = parts
            .next()
            .ok_or_else(|| StoreError::Format("descriptor missing group_size".into()))?
            .parse()
            .map_err(|_| StoreError::Format("descriptor group_size is not an integer".into()))?;

        let dep_basename = if remainder.is_empty() {
            None
        } else {
            Some(remainder.to_string())
        };

        Ok(Descriptor {
            block_size,
            group_size,
            dep_basename,
        })
    }
}
