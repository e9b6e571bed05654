// ABOUTME: Plugin discovery (A6) — loads dynamic plugin libraries from a configured directory
// ABOUTME: Best-effort: a library that fails to load or resolve is skipped with a warning, never fatal

use crate::plugin::Plugin;
use libloading::{Library, Symbol};
use std::path::Path;
use tracing::warn;

/// Symbol every dynamic plugin library must export: a parameterless function
/// returning a heap-allocated `Box<dyn Plugin>` as a raw pointer, which the
/// loader reclaims ownership of via `Box::from_raw`.
const ENTRY_SYMBOL: &[u8] = b"stream_plugin_register\0";

type RegisterFn = unsafe extern "C" fn() -> *mut Box<dyn Plugin>;

/// Scans `dir` for `*.so` files and attempts to load each as a plugin.
///
/// A missing or unreadable directory is the only fatal condition here (it
/// surfaces as a `ConfigError` to the caller); everything past that —
/// individual libraries failing to `dlopen`, missing the entry symbol, or
/// panicking during registration — is logged and skipped. The loaded
/// libraries are intentionally never unloaded: they must outlive every
/// `Box<dyn Plugin>` they produced, and that lifetime is the process itself.
pub fn load_dir(dir: &Path) -> Result<Vec<Box<dyn Plugin>>, crate::error::ConfigError> {
    let entries = std::fs::read_dir(dir).map_err(|source| crate::error::ConfigError::PluginsDirUnreadable {
        path: dir.display().to_string(),
        source,
    })?;

    let mut plugins = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("so") {
            continue;
        }

        match load_one(&path) {
            Ok(plugin) => {
                tracing::info!(path = %path.display(), name = plugin.name(), "loaded dynamic plugin");
                plugins.push(plugin);
            }
            Err(reason) => {
                warn!(path = %path.display(), %reason, "skipping plugin that failed to load");
            }
        }
    }

    Ok(plugins)
}

fn load_one(path: &Path) -> Result<Box<dyn Plugin>, String> {
    // Safety: loading an arbitrary shared object from an operator-configured
    // directory is inherently trusting that object; the spec leaves the
    // on-disk plugin ABI unspecified beyond this single entry symbol.
    let lib = unsafe { Library::new(path) }.map_err(|e| e.to_string())?;

    let register: Symbol<RegisterFn> = unsafe { lib.get(ENTRY_SYMBOL) }.map_err(|e| e.to_string())?;

    let raw = unsafe { register() };
    if raw.is_null() {
        return Err("entry symbol returned a null plugin".to_string());
    }
    let plugin = unsafe { *Box::from_raw(raw) };

    // Leak the library handle so its code stays mapped for as long as the
    // plugin it produced is in use — plugin discovery runs once at startup
    // and every loaded plugin lives for the process's lifetime anyway.
    std::mem::forget(lib);

    Ok(plugin)
}
