use std::sync::Arc;

use tessera_image::{HeapFactory, RasterFactory, Rect, SampleLayout, TileGrid};

use crate::border::BorderExtender;
use crate::cache::TileCache;

/// Environment variable switching the in-place optimization off when set to
/// `false` or `0`.
pub const IN_PLACE_ENV: &str = "TESSERA_IN_PLACE";

/// Settings shared by every kind of operator.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use tessera_imgproc::border::BorderMode;
/// use tessera_imgproc::operator::OperatorConfig;
///
/// let config = OperatorConfig::default()
///     .with_background(vec![255.0, 0.0, 0.0])
///     .with_border_extender(Arc::new(BorderMode::Copy));
///
/// assert_eq!(config.background(), &[255.0, 0.0, 0.0]);
/// ```
#[derive(Clone, Debug)]
pub struct OperatorConfig {
    background: Vec<f64>,
    border_extender: Option<Arc<dyn BorderExtender>>,
    cobble_sources: bool,
    tile_cache: Option<Arc<dyn TileCache>>,
    raster_factory: Arc<dyn RasterFactory>,
    in_place: bool,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            background: Vec::new(),
            border_extender: None,
            cobble_sources: true,
            tile_cache: None,
            raster_factory: Arc::new(HeapFactory),
            in_place: true,
        }
    }
}

impl OperatorConfig {
    /// The default configuration with the in-place switch read from
    /// [`IN_PLACE_ENV`].
    pub fn from_env() -> Self {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Same as [`OperatorConfig::from_env`], reading variables through `lookup`.
    pub fn from_env_with(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let in_place = lookup(IN_PLACE_ENV).map_or(true, |v| parse_switch(&v));
        log::debug!("in-place computation {}", if in_place { "enabled" } else { "disabled" });
        Self::default().with_in_place(in_place)
    }

    /// Per-band values of pixels without source coverage. A shorter array is
    /// broadcast from its first value; an empty one means zero.
    pub fn with_background(mut self, values: Vec<f64>) -> Self {
        self.background = values;
        self
    }

    /// Extends sources beyond their bounds instead of leaving the background.
    pub fn with_border_extender(mut self, extender: Arc<dyn BorderExtender>) -> Self {
        self.border_extender = Some(extender);
        self
    }

    /// Whether point operators read each source as one raster per destination
    /// rectangle, or tile by tile. Warp operators always read one raster.
    pub fn with_cobble_sources(mut self, cobble: bool) -> Self {
        self.cobble_sources = cobble;
        self
    }

    /// Keeps computed tiles in `cache`.
    pub fn with_tile_cache(mut self, cache: Arc<dyn TileCache>) -> Self {
        self.tile_cache = Some(cache);
        self
    }

    /// Allocates destination tiles from `factory`.
    pub fn with_raster_factory(mut self, factory: Arc<dyn RasterFactory>) -> Self {
        self.raster_factory = factory;
        self
    }

    /// Allows point operators to compute into the tile buffers of their source.
    pub fn with_in_place(mut self, in_place: bool) -> Self {
        self.in_place = in_place;
        self
    }

    /// The background values.
    pub fn background(&self) -> &[f64] {
        &self.background
    }

    /// The border extender, if any.
    pub fn border_extender(&self) -> Option<&Arc<dyn BorderExtender>> {
        self.border_extender.as_ref()
    }

    /// Whether sources are cobbled.
    pub fn cobble_sources(&self) -> bool {
        self.cobble_sources
    }

    /// The tile cache, if any.
    pub fn tile_cache(&self) -> Option<&Arc<dyn TileCache>> {
        self.tile_cache.as_ref()
    }

    /// The raster factory.
    pub fn raster_factory(&self) -> &Arc<dyn RasterFactory> {
        &self.raster_factory
    }

    /// Whether in-place computation is allowed.
    pub fn in_place(&self) -> bool {
        self.in_place
    }
}

fn parse_switch(value: &str) -> bool {
    let value = value.trim();
    !(value.eq_ignore_ascii_case("false") || value == "0")
}

/// Layout requested for the output of an operator.
///
/// Unset fields are derived from the sources.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ImageLayout {
    /// Pixel bounds of the image.
    pub bounds: Option<Rect>,
    /// Tiling of the image.
    pub tile_grid: Option<TileGrid>,
    /// Structure of the samples. Only the size is replaced by the tile size.
    pub sample_layout: Option<SampleLayout>,
}

impl ImageLayout {
    /// Requests the bounds of the image.
    pub fn with_bounds(mut self, bounds: Rect) -> Self {
        self.bounds = Some(bounds);
        self
    }

    /// Requests the tiling of the image.
    pub fn with_tile_grid(mut self, grid: TileGrid) -> Self {
        self.tile_grid = Some(grid);
        self
    }

    /// Requests the sample structure of the image.
    pub fn with_sample_layout(mut self, layout: SampleLayout) -> Self {
        self.sample_layout = Some(layout);
        self
    }
}
