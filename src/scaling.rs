//! [`ScalingBloomFilter`]: an ordered sequence of [`BloomFilter`] layers
//! that grows geometrically as earlier layers saturate, while keeping the
//! aggregate false-positive probability bounded.

use std::io;
use std::path::PathBuf;

use crate::bitmap::Bitmap;
use crate::bloom::BloomFilter;
use crate::error::{Error, Result};

/// A callback producing a filesystem path for a new layer's file-backed
/// [`Bitmap`]. Returning `None` from [`ScalingBloomFilter::new`]'s
/// `bitmap_factory` argument makes every layer anonymous.
pub type BitmapFactory = Box<dyn FnMut() -> io::Result<PathBuf> + Send>;

const DEFAULT_SCALE_SIZE: usize = 4;
const DEFAULT_SCALE_PROB: f64 = 0.9;

struct Layer {
    filter: BloomFilter,
    capacity: usize,
    prob: f64,
}

/// A bloom filter that starts at `initial_capacity` and grows by appending
/// new, larger, tighter-probability [`BloomFilter`] layers as the newest
/// one saturates.
///
/// Only the newest layer is ever written to; `contains` probes every layer,
/// newest first.
pub struct ScalingBloomFilter {
    initial_capacity: usize,
    prob: f64,
    scale_size: usize,
    scale_prob: f64,
    filters: Vec<Layer>,
    bitmap_factory: Option<BitmapFactory>,
}

/// The construction-time parameters of a [`ScalingBloomFilter`], useful for
/// persisting how a filter was configured independently of the mmap'd
/// layers themselves (which already carry their own `count`/`k` header).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScalingBloomFilterConfig {
    pub initial_capacity: usize,
    pub prob: f64,
    pub scale_size: usize,
    pub scale_prob: f64,
}

impl ScalingBloomFilter {
    /// Construct a new scaling filter with a single layer sized for
    /// `initial_capacity` entries at aggregate false-positive probability
    /// `prob` (across however many layers the filter eventually grows to).
    ///
    /// `scale_size` (default 4) is the geometric growth factor applied to
    /// capacity on each new layer; `scale_prob` (default 0.9, must be in
    /// `(0, 1)`) is the per-layer tightening factor applied to the
    /// per-layer false-positive target.
    pub fn new(
        initial_capacity: usize,
        prob: f64,
        scale_size: Option<usize>,
        scale_prob: Option<f64>,
        bitmap_factory: Option<BitmapFactory>,
    ) -> Result<Self> {
        if initial_capacity == 0 {
            return Err(Error::InvalidArgument(
                "initial_capacity must be positive".to_string(),
            ));
        }
        if !(0.0 < prob && prob < 1.0) {
            return Err(Error::InvalidArgument(
                "prob must be in (0, 1)".to_string(),
            ));
        }
        let scale_size = scale_size.unwrap_or(DEFAULT_SCALE_SIZE);
        let scale_prob = scale_prob.unwrap_or(DEFAULT_SCALE_PROB);
        if scale_size == 0 {
            return Err(Error::InvalidArgument(
                "scale_size must be positive".to_string(),
            ));
        }
        if !(0.0 < scale_prob && scale_prob < 1.0) {
            return Err(Error::InvalidArgument(
                "scale_prob must be in (0, 1)".to_string(),
            ));
        }

        let mut this = Self {
            initial_capacity,
            prob,
            scale_size,
            scale_prob,
            filters: Vec::new(),
            bitmap_factory,
        };

        // p0 = prob * (1 - scale_prob) so that the geometric series
        // sum(p0 * scale_prob^i) for i in 0.. converges to at most `prob`.
        // Using `prob * scale_prob^i` directly (the pre-0.4.1 behaviour)
        // instead sums to prob / (1 - scale_prob), up to 10x over budget at
        // the default scale_prob.
        let p0 = prob * (1.0 - scale_prob);
        let layer = this.build_layer(initial_capacity, p0)?;
        this.filters.push(layer);

        Ok(this)
    }

    fn build_layer(&mut self, capacity: usize, prob: f64) -> Result<Layer> {
        let (bytes, k) = BloomFilter::params_for_capacity(capacity, prob);

        let bitmap = match self.bitmap_factory.as_mut() {
            Some(factory) => {
                let path = factory()?;
                Bitmap::new(bytes, Some(&path), None)?
            }
            None => Bitmap::new(bytes, None, None)?,
        };

        let filter = BloomFilter::new(bitmap, k)?;

        log::debug!(
            "scaling bloom filter: new layer capacity={capacity} prob={prob:.8} bytes={bytes} k={k}"
        );

        Ok(Layer {
            filter,
            capacity,
            prob,
        })
    }

    /// Insert `key` into the newest layer, growing the filter afterwards if
    /// that layer has now reached its capacity.
    ///
    /// Only the newest layer is consulted for deduplication: a key already
    /// present in an older layer but not the newest one will be re-added to
    /// the newest layer. This is accepted, documented behaviour, not a bug.
    pub fn add(&mut self, key: &[u8]) -> Result<bool> {
        let (added, should_grow) = {
            let newest = self.filters.last_mut().expect("filters is never empty");
            let added = newest.filter.add(key, true);
            (added, newest.filter.len() >= newest.capacity)
        };

        if should_grow {
            self.grow()?;
        }

        Ok(added)
    }

    fn grow(&mut self) -> Result<()> {
        let (cap, prob) = {
            let latest = self.filters.last().expect("filters is never empty");
            (latest.capacity, latest.prob)
        };

        let new_cap = cap * self.scale_size;
        let new_prob = prob * self.scale_prob;
        let layer = self.build_layer(new_cap, new_prob)?;
        self.filters.push(layer);
        Ok(())
    }

    /// Return `true` iff any layer contains `key`. Layers are probed newest
    /// first for better cache locality on the common case of recently
    /// inserted keys.
    pub fn contains(&mut self, key: &[u8]) -> bool {
        self.filters
            .iter_mut()
            .rev()
            .any(|layer| layer.filter.contains(key))
    }

    /// Total number of successful inserts across all layers.
    pub fn len(&self) -> usize {
        self.filters.iter().map(|l| l.filter.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sum of each layer's designed capacity.
    pub fn total_capacity(&self) -> usize {
        self.filters.iter().map(|l| l.capacity).sum()
    }

    /// The number of layers currently making up this filter.
    pub fn layer_count(&self) -> usize {
        self.filters.len()
    }

    /// The construction-time parameters this filter was built with.
    pub fn config(&self) -> ScalingBloomFilterConfig {
        ScalingBloomFilterConfig {
            initial_capacity: self.initial_capacity,
            prob: self.prob,
            scale_size: self.scale_size,
            scale_prob: self.scale_prob,
        }
    }

    /// Flush every layer.
    ///
    /// If every layer is anonymous (no layer backed by a file), this is a
    /// no-op; a warning is logged since a flush request on a filter with
    /// nothing to persist usually indicates a caller mistake.
    pub fn flush(&mut self) -> Result<()> {
        if self.filters.iter().all(|l| l.filter.path().is_none()) {
            log::warn!("scaling bloom filter: flush requested but no layer is file-backed");
            return Ok(());
        }

        for layer in &mut self.filters {
            layer.filter.flush()?;
        }
        Ok(())
    }

    /// Flush and close every layer.
    pub fn close(self) -> Result<()> {
        for layer in self.filters {
            layer.filter.close()?;
        }
        Ok(())
    }
}

/// Builder for [`ScalingBloomFilter`], offering the same chained-setter
/// style as this crate's other constructors.
#[derive(Default)]
pub struct ScalingBloomFilterBuilder {
    scale_size: Option<usize>,
    scale_prob: Option<f64>,
    bitmap_factory: Option<BitmapFactory>,
}

impl ScalingBloomFilterBuilder {
    pub fn scale_size(mut self, scale_size: usize) -> Self {
        self.scale_size = Some(scale_size);
        self
    }

    pub fn scale_prob(mut self, scale_prob: f64) -> Self {
        self.scale_prob = Some(scale_prob);
        self
    }

    pub fn bitmap_factory<F>(mut self, factory: F) -> Self
    where
        F: FnMut() -> io::Result<PathBuf> + Send + 'static,
    {
        self.bitmap_factory = Some(Box::new(factory));
        self
    }

    /// Build the filter with `initial_capacity` entries and aggregate
    /// false-positive probability `prob`.
    pub fn build(self, initial_capacity: usize, prob: f64) -> Result<ScalingBloomFilter> {
        ScalingBloomFilter::new(
            initial_capacity,
            prob,
            self.scale_size,
            self.scale_prob,
            self.bitmap_factory,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn single_layer_add_contains() {
        let mut sbf = ScalingBloomFilter::new(1000, 0.01, None, None, None).unwrap();
        assert!(!sbf.contains(b"hello"));
        sbf.add(b"hello").unwrap();
        assert!(sbf.contains(b"hello"));
        assert_eq!(sbf.len(), 1);
    }

    #[test]
    fn config_reports_construction_parameters() {
        let sbf = ScalingBloomFilter::new(500, 0.02, Some(8), Some(0.5), None).unwrap();
        let cfg = sbf.config();
        assert_eq!(cfg.initial_capacity, 500);
        assert_eq!(cfg.prob, 0.02);
        assert_eq!(cfg.scale_size, 8);
        assert_eq!(cfg.scale_prob, 0.5);
    }

    #[test]
    fn grows_past_initial_capacity() {
        let mut sbf = ScalingBloomFilter::new(1000, 0.01, None, None, None).unwrap();
        for i in 0..2000u32 {
            sbf.add(format!("test{i}").as_bytes()).unwrap();
        }

        assert_eq!(sbf.len(), 2000);
        assert!(sbf.total_capacity() > 1000);
        assert!(sbf.layer_count() >= 2);
    }

    #[test]
    fn factory_is_called_once_per_layer() {
        let counter = Arc::new(AtomicUsize::new(0));
        let factory_counter = Arc::clone(&counter);

        let dir = tempfile::tempdir().unwrap();
        let dir_path = dir.path().to_path_buf();

        let factory = move || -> io::Result<PathBuf> {
            let n = factory_counter.fetch_add(1, Ordering::SeqCst);
            Ok(dir_path.join(format!("layer-{n}.bin")))
        };

        let mut sbf = ScalingBloomFilterBuilder::default()
            .bitmap_factory(factory)
            .build(1000, 0.01)
            .unwrap();

        assert_eq!(counter.load(Ordering::SeqCst), 1);

        for i in 0..2000u32 {
            sbf.add(format!("test{i}").as_bytes()).unwrap();
        }

        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn aggregate_probability_budget_is_respected() {
        // p0 must be 0.1 * prob at the default scale_prob of 0.9.
        let sbf = ScalingBloomFilter::new(1000, 0.01, None, None, None).unwrap();
        let p0 = sbf.filters[0].prob;
        assert!((p0 - 0.001).abs() < 1e-12, "got {p0}");
    }

    #[test]
    fn flush_on_all_anonymous_filter_is_a_no_op() {
        let mut sbf = ScalingBloomFilter::new(1000, 0.01, None, None, None).unwrap();
        sbf.add(b"hello").unwrap();
        // No file-backed layer exists; flush must not error, just warn.
        sbf.flush().unwrap();
    }

    #[cfg(feature = "mmap")]
    #[test]
    fn flush_on_file_backed_filter_persists_layers() {
        let dir = tempfile::tempdir().unwrap();
        let dir_path = dir.path().to_path_buf();
        let mut n = 0usize;
        let factory = move || -> io::Result<PathBuf> {
            n += 1;
            Ok(dir_path.join(format!("layer-{n}.bin")))
        };

        let mut sbf = ScalingBloomFilterBuilder::default()
            .bitmap_factory(factory)
            .build(1000, 0.01)
            .unwrap();
        sbf.add(b"hello").unwrap();
        sbf.flush().unwrap();
    }

    #[test]
    fn false_positive_rate_stays_bounded_under_scaling() {
        let mut sbf = ScalingBloomFilter::new(10_000, 0.01, None, None, None).unwrap();
        for i in 0..100_000u32 {
            sbf.add(&i.to_le_bytes()).unwrap();
        }

        let mut false_positives = 0;
        for i in 1_000_000..1_010_000u32 {
            if sbf.contains(&i.to_le_bytes()) {
                false_positives += 1;
            }
        }

        let rate = false_positives as f64 / 10_000.0;
        assert!(rate <= 0.02, "false positive rate too high: {rate}");
    }
}
