//! FILENAME: core/table-engine/src/utils.rs
//! PURPOSE: Small generic helpers shared by every layer of the engine.
//! CONTEXT: Memo cells keyed by dependency values, pointer-identity keys,
//! updater application, tree flattening and path-based JSON access.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::time::Instant;

// ============================================================================
// UPDATERS
// ============================================================================

/// A proposed change to a piece of state: either a literal next value or a
/// function of the previous value.
pub enum Updater<S> {
    Replace(S),
    Update(Box<dyn FnOnce(&S) -> S>),
}

impl<S> Updater<S> {
    /// Wraps a function of the previous value.
    pub fn with(f: impl FnOnce(&S) -> S + 'static) -> Self {
        Updater::Update(Box::new(f))
    }
}

impl<S> From<S> for Updater<S> {
    fn from(value: S) -> Self {
        Updater::Replace(value)
    }
}

impl<S: fmt::Debug> fmt::Debug for Updater<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Updater::Replace(value) => f.debug_tuple("Replace").field(value).finish(),
            Updater::Update(_) => f.write_str("Update(..)"),
        }
    }
}

/// Applies an updater to the previous value.
pub fn functional_update<S>(updater: Updater<S>, old: &S) -> S {
    match updater {
        Updater::Replace(value) => value,
        Updater::Update(f) => f(old),
    }
}

// ============================================================================
// IDENTITY KEYS
// ============================================================================

/// Compares an `Rc` by address, so memo dependencies can track "same input"
/// without comparing contents.
pub struct PtrEq<T: ?Sized>(pub Rc<T>);

impl<T: ?Sized> PtrEq<T> {
    pub fn new(rc: &Rc<T>) -> Self {
        PtrEq(Rc::clone(rc))
    }
}

impl<T: ?Sized> Clone for PtrEq<T> {
    fn clone(&self) -> Self {
        PtrEq(Rc::clone(&self.0))
    }
}

impl<T: ?Sized> PartialEq for PtrEq<T> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl<T: ?Sized> fmt::Debug for PtrEq<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PtrEq({:p})", Rc::as_ptr(&self.0))
    }
}

/// Identity of an optional shared callback.
pub fn ptr_key<T: ?Sized>(rc: &Option<Rc<T>>) -> Option<PtrEq<T>> {
    rc.as_ref().map(PtrEq::new)
}

// ============================================================================
// MEMO
// ============================================================================

/// A cache cell holding the last dependency list and the output computed from it.
///
/// `get` recomputes only when the dependencies differ from the cached ones.
/// The cell is not borrowed while `compute` runs, so computations may read
/// other memo cells.
pub struct Memo<D, O> {
    key: &'static str,
    cached: RefCell<Option<(D, O)>>,
}

impl<D: PartialEq, O: Clone> Memo<D, O> {
    pub fn new(key: &'static str) -> Self {
        Memo {
            key,
            cached: RefCell::new(None),
        }
    }

    /// Returns the cached output for `deps`, or computes and caches it.
    pub fn get(&self, deps: D, compute: impl FnOnce(&D) -> O) -> O {
        self.get_logged(deps, false, compute)
    }

    /// `get`, logging the recomputation at debug level when `debug` is set.
    pub fn get_logged(&self, deps: D, debug: bool, compute: impl FnOnce(&D) -> O) -> O {
        if let Some(out) = self.cached_for(&deps) {
            return out;
        }
        let started = Instant::now();
        let out = compute(&deps);
        self.log_recompute(started, debug);
        *self.cached.borrow_mut() = Some((deps, out.clone()));
        out
    }

    /// Like `get`, but a failed computation is returned and not cached.
    pub fn try_get<E>(
        &self,
        deps: D,
        debug: bool,
        compute: impl FnOnce(&D) -> Result<O, E>,
    ) -> Result<O, E> {
        if let Some(out) = self.cached_for(&deps) {
            return Ok(out);
        }
        let started = Instant::now();
        let out = compute(&deps)?;
        self.log_recompute(started, debug);
        *self.cached.borrow_mut() = Some((deps, out.clone()));
        Ok(out)
    }

    fn cached_for(&self, deps: &D) -> Option<O> {
        let cached = self.cached.borrow();
        match cached.as_ref() {
            Some((last, out)) if last == deps => Some(out.clone()),
            _ => None,
        }
    }

    fn log_recompute(&self, started: Instant, debug: bool) {
        let elapsed = started.elapsed();
        if debug {
            log::debug!(target: "table_engine::memo", "{} recomputed in {:?}", self.key, elapsed);
        } else {
            log::trace!(target: "table_engine::memo", "{} recomputed in {:?}", self.key, elapsed);
        }
    }
}

impl<D, O> fmt::Debug for Memo<D, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memo")
            .field("key", &self.key)
            .field("cached", &self.cached.borrow().is_some())
            .finish()
    }
}

// ============================================================================
// TREES AND PATHS
// ============================================================================

/// Pre-order flattening of a forest, descending through `children`.
/// The roots themselves are included.
pub fn flatten_by<N: Clone>(roots: &[N], children: impl Fn(&N) -> &[N]) -> Vec<N> {
    fn recurse<N: Clone>(nodes: &[N], children: &dyn Fn(&N) -> &[N], out: &mut Vec<N>) {
        for node in nodes {
            out.push(node.clone());
            recurse(children(node), children, out);
        }
    }

    let mut out = Vec::new();
    recurse(roots, &children, &mut out);
    out
}

/// Walks a dotted path (`"a.b.0.c"`) through nested JSON objects and arrays.
pub fn get_by_path<'a>(value: &'a serde_json::Value, path: &str) -> Option<&'a serde_json::Value> {
    // A literal key containing dots wins over a nested walk
    if let Some(direct) = value.get(path) {
        return Some(direct);
    }
    let mut current = value;
    for segment in path.split('.') {
        current = match current {
            serde_json::Value::Object(map) => map.get(segment)?,
            serde_json::Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_functional_update() {
        assert_eq!(functional_update(Updater::Replace(3), &1), 3);
        assert_eq!(functional_update(Updater::with(|old: &i32| old + 1), &1), 2);
    }

    #[test]
    fn test_memo_recomputes_only_on_change() {
        let memo: Memo<u32, Rc<String>> = Memo::new("test");
        let calls = Cell::new(0);
        let compute = |d: &u32| {
            calls.set(calls.get() + 1);
            Rc::new(format!("v{}", d))
        };

        let a = memo.get(1, compute);
        let b = memo.get(1, compute);
        assert!(Rc::ptr_eq(&a, &b));
        assert_eq!(calls.get(), 1);

        let c = memo.get(2, compute);
        assert!(!Rc::ptr_eq(&a, &c));
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_memo_does_not_cache_errors() {
        let memo: Memo<u32, u32> = Memo::new("fallible");
        let failed: Result<u32, &str> = memo.try_get(1, false, |_| Err("boom"));
        assert!(failed.is_err());
        let ok: Result<u32, &str> = memo.try_get(1, false, |d| Ok(d * 10));
        assert_eq!(ok, Ok(10));
    }

    #[test]
    fn test_ptr_eq_compares_identity() {
        let a = Rc::new(vec![1]);
        let b = Rc::new(vec![1]);
        assert_eq!(PtrEq::new(&a), PtrEq::new(&a));
        assert_ne!(PtrEq::new(&a), PtrEq::new(&b));
    }

    #[test]
    fn test_flatten_by_is_pre_order() {
        #[derive(Clone)]
        struct Node(u32, Vec<Node>);
        let forest = vec![Node(1, vec![Node(2, vec![]), Node(3, vec![Node(4, vec![])])]), Node(5, vec![])];
        let flat: Vec<u32> = flatten_by(&forest, |n| n.1.as_slice()).iter().map(|n| n.0).collect();
        assert_eq!(flat, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_get_by_path_walks_arrays() {
        let value = serde_json::json!({ "tags": ["a", "b"], "meta": { "owner": { "name": "x" } } });
        assert_eq!(get_by_path(&value, "tags.1"), Some(&serde_json::json!("b")));
        assert_eq!(get_by_path(&value, "meta.owner.name"), Some(&serde_json::json!("x")));
        assert_eq!(get_by_path(&value, "meta.missing"), None);
    }
}
