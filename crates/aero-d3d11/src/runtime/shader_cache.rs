use std::collections::HashMap;
use std::sync::Arc;

use crate::compiler::compile_bytecode;
use crate::diagnostics::CompiledShader;
use crate::error::CompileError;
use crate::options::CompilerOptions;

/// Content hash of a bytecode blob and the options it is translated with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ShaderCacheKey([u8; 32]);

impl ShaderCacheKey {
    pub fn compute(bytecode: &[u8], options: &CompilerOptions) -> Self {
        const VERSION: &[u8] = b"aero-d3d11 spirv shader cache v1";

        let mut hasher = blake3::Hasher::new();
        hasher.update(VERSION);
        hasher.update(&(bytecode.len() as u64).to_le_bytes());
        hasher.update(bytecode);
        hasher.update(&(options.entry_point.len() as u32).to_le_bytes());
        hasher.update(options.entry_point.as_bytes());
        hasher.update(&[
            u8::from(options.strict_coverage),
            u8::from(options.debug_names),
        ]);
        Self(*hasher.finalize().as_bytes())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

/// Where a lookup's result came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShaderCacheSource {
    Memory,
    /// Cache miss; the bytecode was translated.
    Translated,
}

#[derive(Clone, Debug)]
pub struct ShaderCacheLookup {
    pub source: ShaderCacheSource,
    pub shader: Arc<CompiledShader>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ShaderCacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// Memoizes translations by content.
///
/// Failed translations are never stored, so a retry translates again and
/// reports the same error.
#[derive(Debug, Default)]
pub struct ShaderCache {
    map: HashMap<ShaderCacheKey, Arc<CompiledShader>>,
    options: CompilerOptions,
    hits: u64,
    misses: u64,
}

impl ShaderCache {
    pub fn new(options: CompilerOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    /// Options for later lookups. Entries built with other options stay
    /// cached under their own keys.
    pub fn set_options(&mut self, options: CompilerOptions) {
        self.options = options;
    }

    pub fn get_or_compile(&mut self, bytecode: &[u8]) -> Result<ShaderCacheLookup, CompileError> {
        use std::collections::hash_map::Entry;

        let key = ShaderCacheKey::compute(bytecode, &self.options);
        match self.map.entry(key) {
            Entry::Occupied(e) => {
                self.hits += 1;
                Ok(ShaderCacheLookup {
                    source: ShaderCacheSource::Memory,
                    shader: e.get().clone(),
                })
            }
            Entry::Vacant(e) => {
                self.misses += 1;
                let shader = Arc::new(compile_bytecode(bytecode, &self.options)?);
                e.insert(shader.clone());
                Ok(ShaderCacheLookup {
                    source: ShaderCacheSource::Translated,
                    shader,
                })
            }
        }
    }

    pub fn stats(&self) -> ShaderCacheStats {
        ShaderCacheStats {
            hits: self.hits,
            misses: self.misses,
            entries: self.map.len(),
        }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_depends_on_options() {
        let bytes = [1u8, 2, 3, 4];
        let default = ShaderCacheKey::compute(&bytes, &CompilerOptions::default());
        assert_eq!(
            default,
            ShaderCacheKey::compute(&bytes, &CompilerOptions::default())
        );
        assert_ne!(
            default,
            ShaderCacheKey::compute(&bytes, &CompilerOptions::strict())
        );
        let renamed = CompilerOptions {
            entry_point: "ps_main".to_owned(),
            ..CompilerOptions::default()
        };
        assert_ne!(default, ShaderCacheKey::compute(&bytes, &renamed));
    }

    #[test]
    fn failures_are_not_cached() {
        let mut cache = ShaderCache::default();
        let garbage = [0u8; 6];
        assert!(cache.get_or_compile(&garbage).is_err());
        assert!(cache.get_or_compile(&garbage).is_err());
        assert!(cache.is_empty());
        assert_eq!(cache.stats().misses, 2);
    }
}
