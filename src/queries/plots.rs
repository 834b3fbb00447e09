//! Chart image browsing over `<symbol>_<date>_*.png` objects.

use tracing::debug;

use crate::error::Result;
use crate::models::{PlotIndex, PlotKey};
use crate::store::{KeyFilter, ObjectStore};

// ---------------------------------------------------------------------------
// PlotQuery
// ---------------------------------------------------------------------------

/// Query interface for stored chart images.
pub struct PlotQuery<'a> {
    store: &'a dyn ObjectStore,
    prefix: &'a str,
}

impl<'a> PlotQuery<'a> {
    pub fn new(store: &'a dyn ObjectStore, prefix: &'a str) -> Self {
        Self { store, prefix }
    }

    /// List the images under the plots prefix and index them.
    ///
    /// An empty index is the empty state, not an error.
    pub fn index(&self) -> Result<PlotIndex> {
        let keys = self.store.list(self.prefix, &KeyFilter::plot_images())?;
        let index = PlotIndex::from_keys(&keys);
        debug!(
            listed = keys.len(),
            indexed = index.len(),
            prefix = self.prefix,
            "indexed plot images"
        );
        Ok(index)
    }

    /// Bytes of the image at `plot.key`.
    pub fn fetch(&self, plot: &PlotKey) -> Result<Vec<u8>> {
        self.store.fetch(&plot.key)
    }

    /// The first image for `(symbol, date)`, or `None` if there is none.
    pub fn image(&self, symbol: &str, date: &str) -> Result<Option<(PlotKey, Vec<u8>)>> {
        let index = self.index()?;
        match index.resolve(symbol, date) {
            Some(plot) => {
                let bytes = self.fetch(plot)?;
                Ok(Some((plot.clone(), bytes)))
            }
            None => Ok(None),
        }
    }
}
