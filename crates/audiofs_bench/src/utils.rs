//! Benchmark utilities.

use rand::Rng;

/// Generate random payload data of the specified size.
pub fn random_data(size: usize) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    (0..size).map(|_| rng.gen()).collect()
}

/// Split `total` bytes of random data into encoder-sized packets.
pub fn packets(total: usize, packet_size: usize) -> Vec<Vec<u8>> {
    let data = random_data(total);
    data.chunks(packet_size.max(1)).map(<[u8]>::to_vec).collect()
}
