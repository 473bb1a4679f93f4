//! Symbol resolution
//!
//! Maps a free-text query to the ticker set the market branch fetches.
//! Real entity extraction lives outside this crate; implement
//! `SymbolResolver` to plug one in.

/// `query -> symbols`, pure and synchronous
pub trait SymbolResolver: Send + Sync {
    fn resolve(&self, query: &str) -> Vec<String>;
}

impl<F> SymbolResolver for F
where
    F: Fn(&str) -> Vec<String> + Send + Sync,
{
    fn resolve(&self, query: &str) -> Vec<String> {
        self(query)
    }
}

/// Fixed watch list. Narrows to the watch-list tickers named in the
/// query, if any, otherwise returns the whole list.
pub struct StaticSymbolResolver {
    watchlist: Vec<String>,
}

impl StaticSymbolResolver {
    pub fn new(watchlist: Vec<String>) -> Self {
        Self { watchlist }
    }
}

impl SymbolResolver for StaticSymbolResolver {
    fn resolve(&self, query: &str) -> Vec<String> {
        let tokens: Vec<String> = query
            .split(|c: char| !(c.is_alphanumeric() || c == '.'))
            .map(|t| t.trim_end_matches('.').to_uppercase())
            .filter(|t| !t.is_empty())
            .collect();

        let mentioned: Vec<String> = self
            .watchlist
            .iter()
            .filter(|symbol| tokens.iter().any(|t| t == *symbol))
            .cloned()
            .collect();

        if mentioned.is_empty() {
            self.watchlist.clone()
        } else {
            mentioned
        }
    }
}
