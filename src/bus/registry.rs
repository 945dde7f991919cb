//! Symbol-style action identifiers and their registry.

use super::error::RegistryError;
use super::ActionRegistry;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

static NEXT_SYMBOL_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque action identifier compared by identity, not by description.
///
/// Two symbols created with [`Symbol::new`] are always distinct, even with
/// the same description. Symbols obtained from a [`SymbolRegistry`] under the
/// same key are the same symbol.
///
/// # Example
///
/// ```rust
/// use dispatch_recorder::bus::{Symbol, SymbolRegistry};
///
/// assert_ne!(Symbol::new("inc"), Symbol::new("inc"));
///
/// let registry = SymbolRegistry::new();
/// let a = registry.symbol_for("inc").unwrap();
/// let b = registry.symbol_for("inc").unwrap();
/// assert_eq!(a, b);
/// ```
#[derive(Clone)]
pub struct Symbol {
    id: u64,
    description: Arc<str>,
}

impl Symbol {
    /// Create a local symbol. It is not registered anywhere.
    pub fn new(description: &str) -> Self {
        Self {
            id: NEXT_SYMBOL_ID.fetch_add(1, Ordering::Relaxed),
            description: Arc::from(description),
        }
    }

    /// Text the symbol was created with; not necessarily a registry key.
    pub fn description(&self) -> &str {
        &self.description
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Symbol {}

impl Hash for Symbol {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self.description)
    }
}

#[derive(Default)]
struct Entries {
    by_key: HashMap<String, Symbol>,
    by_id: HashMap<u64, String>,
}

/// Registry handing out one [`Symbol`] per text key.
///
/// Unknown keys are registered on first lookup unless the registry has been
/// [sealed](SymbolRegistry::seal).
#[derive(Default)]
pub struct SymbolRegistry {
    entries: RwLock<Entries>,
    sealed: AtomicBool,
}

impl SymbolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Symbol registered under `key`, creating it if needed.
    pub fn symbol_for(&self, key: &str) -> Result<Symbol, RegistryError> {
        if let Some(symbol) = self.read().by_key.get(key) {
            return Ok(symbol.clone());
        }
        if self.is_sealed() {
            return Err(RegistryError::Sealed {
                key: key.to_string(),
            });
        }

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        // Another writer may have registered the key between the two locks.
        if let Some(symbol) = entries.by_key.get(key) {
            return Ok(symbol.clone());
        }
        let symbol = Symbol::new(key);
        entries.by_id.insert(symbol.id, key.to_string());
        entries.by_key.insert(key.to_string(), symbol.clone());
        Ok(symbol)
    }

    /// Key `symbol` is registered under, `None` for local symbols.
    pub fn key_for(&self, symbol: &Symbol) -> Option<String> {
        self.read().by_id.get(&symbol.id).cloned()
    }

    /// Refuse any further registration. Existing keys keep resolving.
    pub fn seal(&self) {
        self.sealed.store(true, Ordering::Release);
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed.load(Ordering::Acquire)
    }

    pub fn len(&self) -> usize {
        self.read().by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().by_key.is_empty()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Entries> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for SymbolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SymbolRegistry")
            .field("len", &self.len())
            .field("sealed", &self.is_sealed())
            .finish()
    }
}

impl ActionRegistry for SymbolRegistry {
    type Action = Symbol;

    fn lookup(&self, key: &str) -> Result<Symbol, RegistryError> {
        self.symbol_for(key)
    }

    fn key_of(&self, action: &Symbol) -> Option<String> {
        self.key_for(action)
    }
}
