//! Blake2b-256, the one hash behind every storage address.

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use spamdb_types::StoreAddress;

type Blake2b256 = Blake2b<U32>;

pub fn blake2b_256(data: &[u8]) -> [u8; 32] {
    blake2b_256_multi(&[data])
}

/// Hash the parts as if concatenated, without allocating the concatenation.
pub fn blake2b_256_multi(parts: &[&[u8]]) -> [u8; 32] {
    let digest = parts
        .iter()
        .fold(Blake2b256::new(), |hasher, part| hasher.chain_update(part))
        .finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&digest);
    output
}

/// Hash the parts straight into a [`StoreAddress`].
pub fn hash_address(parts: &[&[u8]]) -> StoreAddress {
    StoreAddress::new(blake2b_256_multi(parts))
}
