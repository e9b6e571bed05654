// ABOUTME: Built-in and dynamically-loaded capture plugins
// ABOUTME: `mjpeg` is always registered; `loader` discovers additional plugins from a directory

pub mod loader;
pub mod mjpeg;
