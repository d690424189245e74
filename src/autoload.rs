//! Fallback dispatch for unresolved symbols
//!
//! The host keeps an ordered [`AutoloadChain`]. When it meets a symbol it
//! cannot find, it asks each registered loader in turn; the first one that
//! returns `true` ends the search. Returning `false` is never an error, it
//! only means "try the next loader".

/// A fallback resolver the host can consult for an unknown symbol
pub trait Autoload {
    /// Try to make `symbol` available; `false` passes it to the next loader
    fn autoload(&mut self, symbol: &str) -> bool;
}

impl<A: Autoload + ?Sized> Autoload for &mut A {
    fn autoload(&mut self, symbol: &str) -> bool {
        (**self).autoload(symbol)
    }
}

impl<A: Autoload + ?Sized> Autoload for Box<A> {
    fn autoload(&mut self, symbol: &str) -> bool {
        (**self).autoload(symbol)
    }
}

/// Loader backed by a closure
pub struct FnAutoload<F>(F);

impl<F: FnMut(&str) -> bool> Autoload for FnAutoload<F> {
    fn autoload(&mut self, symbol: &str) -> bool {
        (self.0)(symbol)
    }
}

/// Wrap a closure as an [`Autoload`] implementation
pub fn from_fn<F: FnMut(&str) -> bool>(f: F) -> FnAutoload<F> {
    FnAutoload(f)
}

/// Ordered list of fallback loaders
#[derive(Default)]
pub struct AutoloadChain<'a> {
    loaders: Vec<Box<dyn Autoload + 'a>>,
}

impl<'a> AutoloadChain<'a> {
    pub fn new() -> Self {
        Self {
            loaders: Vec::new(),
        }
    }

    /// Append a loader; it runs after every loader registered before it
    pub fn register(&mut self, loader: impl Autoload + 'a) -> &mut Self {
        self.loaders.push(Box::new(loader));
        self
    }

    /// Insert a loader ahead of all others
    pub fn prepend(&mut self, loader: impl Autoload + 'a) -> &mut Self {
        self.loaders.insert(0, Box::new(loader));
        self
    }

    pub fn len(&self) -> usize {
        self.loaders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loaders.is_empty()
    }
}

impl Autoload for AutoloadChain<'_> {
    fn autoload(&mut self, symbol: &str) -> bool {
        for (i, loader) in self.loaders.iter_mut().enumerate() {
            if loader.autoload(symbol) {
                log::trace!("'{}' resolved by loader #{}", symbol, i);
                return true;
            }
        }
        log::debug!("'{}' not resolved by any of {} loaders", symbol, self.loaders.len());
        false
    }
}
