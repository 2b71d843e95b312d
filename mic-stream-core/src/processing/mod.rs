pub mod capture_buffer;
pub mod pcm;
pub mod position;
pub mod ring_buffer;
