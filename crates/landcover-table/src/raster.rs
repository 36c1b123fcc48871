//! In-memory label and predictor rasters.
//!
//! The pipeline only needs two operations from a raster source: enumerate
//! the labeled pixels inside a region, and extract predictor values at
//! chosen pixels. [`LabeledRaster`] and [`PredictorRaster`] capture those;
//! [`LabelGrid`] and [`BandStack`] are the in-memory implementations.

use std::sync::Arc;

use crate::error::TableError;
use crate::label::ClassLabel;
use crate::schema::Schema;
use crate::table::FeatureTable;

/// Axis-aligned bounding rectangle in map coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    min_x: f64,
    min_y: f64,
    max_x: f64,
    max_y: f64,
}

impl Region {
    /// Create a region from its west, south, east and north bounds.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::InvalidRegion`] if a bound is non-finite or
    /// `min > max` on either axis.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Result<Self, TableError> {
        let finite = [min_x, min_y, max_x, max_y].iter().all(|v| v.is_finite());
        if !finite || min_x > max_x || min_y > max_y {
            return Err(TableError::InvalidRegion {
                min_x,
                min_y,
                max_x,
                max_y,
            });
        }
        Ok(Self {
            min_x,
            min_y,
            max_x,
            max_y,
        })
    }

    /// Return `true` if the point lies inside the region (bounds inclusive).
    #[must_use]
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }
}

/// Column/row position of a pixel in a grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PixelLocation {
    /// Zero-based column (west to east).
    pub col: usize,
    /// Zero-based row (north to south).
    pub row: usize,
}

/// A pixel location together with its reference class label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabeledPixel {
    /// Where the pixel is.
    pub location: PixelLocation,
    /// The reference label at that pixel.
    pub label: ClassLabel,
}

/// North-up grid geometry: top-left origin, square pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridGeometry {
    origin_x: f64,
    origin_y: f64,
    pixel_size: f64,
    width: usize,
    height: usize,
}

impl GridGeometry {
    /// Create a grid geometry.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::InvalidPixelSize`] if `pixel_size` is not
    /// positive and finite.
    pub fn new(
        origin_x: f64,
        origin_y: f64,
        pixel_size: f64,
        width: usize,
        height: usize,
    ) -> Result<Self, TableError> {
        if !(pixel_size.is_finite() && pixel_size > 0.0) {
            return Err(TableError::InvalidPixelSize { pixel_size });
        }
        Ok(Self {
            origin_x,
            origin_y,
            pixel_size,
            width,
            height,
        })
    }

    /// Return the grid width in pixels.
    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Return the grid height in pixels.
    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Return the native pixel size in map units.
    #[must_use]
    pub fn pixel_size(&self) -> f64 {
        self.pixel_size
    }

    /// Return the total number of cells.
    #[must_use]
    pub fn n_cells(&self) -> usize {
        self.width * self.height
    }

    /// Return the map coordinates of a pixel centre.
    #[must_use]
    pub fn cell_center(&self, location: PixelLocation) -> (f64, f64) {
        (
            self.origin_x + (location.col as f64 + 0.5) * self.pixel_size,
            self.origin_y - (location.row as f64 + 0.5) * self.pixel_size,
        )
    }

    /// Return the row-major cell index of a location.
    #[must_use]
    pub fn index(&self, location: PixelLocation) -> usize {
        location.row * self.width + location.col
    }

    /// Return the pixel step used when sampling at `scale`.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::InvalidScale`] if `scale` is not positive and finite.
    pub fn stride(&self, scale: f64) -> Result<usize, TableError> {
        if !(scale.is_finite() && scale > 0.0) {
            return Err(TableError::InvalidScale { scale });
        }
        Ok(((scale / self.pixel_size).round() as usize).max(1))
    }

    /// Return every sampled location whose centre lies in `region`, in
    /// row-major order.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::InvalidScale`] if `scale` is not positive and finite.
    pub fn locations_in(
        &self,
        region: &Region,
        scale: f64,
    ) -> Result<Vec<PixelLocation>, TableError> {
        let stride = self.stride(scale)?;
        let mut out = Vec::new();
        for row in (0..self.height).step_by(stride) {
            for col in (0..self.width).step_by(stride) {
                let location = PixelLocation { col, row };
                let (x, y) = self.cell_center(location);
                if region.contains(x, y) {
                    out.push(location);
                }
            }
        }
        Ok(out)
    }

    fn check_cells(&self, band: &str, got: usize) -> Result<(), TableError> {
        if got != self.n_cells() {
            return Err(TableError::GridSizeMismatch {
                band: band.to_string(),
                width: self.width,
                height: self.height,
                got,
            });
        }
        Ok(())
    }
}

/// A raster whose pixels carry reference class labels.
pub trait LabeledRaster {
    /// Return every labeled pixel inside `region` at sampling `scale`.
    /// Unlabeled (no-data) pixels are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::InvalidScale`] for a non-positive scale.
    fn labeled_pixels(&self, region: &Region, scale: f64) -> Result<Vec<LabeledPixel>, TableError>;
}

/// A multi-band raster of numeric predictors.
pub trait PredictorRaster {
    /// Return the band names as a schema.
    fn schema(&self) -> &Schema;

    /// Build a feature table from the predictor values at `pixels`, keeping
    /// each pixel's label. Pixels with any missing band are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::InvalidScale`] for a non-positive scale.
    fn extract(&self, pixels: &[LabeledPixel], scale: f64) -> Result<FeatureTable, TableError>;
}

/// In-memory single-band label raster. `None` cells are no-data.
#[derive(Debug, Clone)]
pub struct LabelGrid {
    geometry: GridGeometry,
    cells: Vec<Option<ClassLabel>>,
}

impl LabelGrid {
    /// Create a label grid from row-major cells.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::GridSizeMismatch`] if `cells.len()` differs
    /// from `width * height`.
    pub fn new(geometry: GridGeometry, cells: Vec<Option<ClassLabel>>) -> Result<Self, TableError> {
        geometry.check_cells("labels", cells.len())?;
        Ok(Self { geometry, cells })
    }

    /// Return the grid geometry.
    #[must_use]
    pub fn geometry(&self) -> &GridGeometry {
        &self.geometry
    }

    /// Return the label at `location`, if any.
    #[must_use]
    pub fn get(&self, location: PixelLocation) -> Option<ClassLabel> {
        if location.col >= self.geometry.width || location.row >= self.geometry.height {
            return None;
        }
        self.cells[self.geometry.index(location)]
    }

    /// Return the row-major cells.
    #[must_use]
    pub fn cells(&self) -> &[Option<ClassLabel>] {
        &self.cells
    }
}

impl LabeledRaster for LabelGrid {
    fn labeled_pixels(&self, region: &Region, scale: f64) -> Result<Vec<LabeledPixel>, TableError> {
        Ok(self
            .geometry
            .locations_in(region, scale)?
            .into_iter()
            .filter_map(|location| {
                self.get(location)
                    .map(|label| LabeledPixel { location, label })
            })
            .collect())
    }
}

/// In-memory stack of named predictor bands over one grid. NaN is no-data.
#[derive(Debug, Clone)]
pub struct BandStack {
    geometry: GridGeometry,
    schema: Arc<Schema>,
    bands: Vec<Vec<f64>>,
}

impl BandStack {
    /// Create a band stack from `(name, row-major cells)` pairs.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`TableError::EmptySchema`] | no bands |
    /// | [`TableError::DuplicateAttribute`] | two bands share a name |
    /// | [`TableError::GridSizeMismatch`] | a band has the wrong cell count |
    pub fn new(
        geometry: GridGeometry,
        bands: Vec<(String, Vec<f64>)>,
    ) -> Result<Self, TableError> {
        let schema = Schema::new(bands.iter().map(|(name, _)| name.clone()))?;
        for (name, cells) in &bands {
            geometry.check_cells(name, cells.len())?;
        }
        Ok(Self {
            geometry,
            schema: Arc::new(schema),
            bands: bands.into_iter().map(|(_, cells)| cells).collect(),
        })
    }

    /// Return the grid geometry.
    #[must_use]
    pub fn geometry(&self) -> &GridGeometry {
        &self.geometry
    }

    /// Return the band values at `location`, in schema order, or `None`
    /// outside the grid.
    #[must_use]
    pub fn pixel_values(&self, location: PixelLocation) -> Option<Vec<f64>> {
        if location.col >= self.geometry.width || location.row >= self.geometry.height {
            return None;
        }
        self.cell_values(self.geometry.index(location))
    }

    /// Return the band values at a row-major cell index, or `None` past the
    /// last cell.
    #[must_use]
    pub fn cell_values(&self, idx: usize) -> Option<Vec<f64>> {
        (idx < self.geometry.n_cells()).then(|| self.bands.iter().map(|band| band[idx]).collect())
    }
}

impl PredictorRaster for BandStack {
    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn extract(&self, pixels: &[LabeledPixel], scale: f64) -> Result<FeatureTable, TableError> {
        self.geometry.stride(scale)?;
        let mut builder = FeatureTable::builder((*self.schema).clone());
        for pixel in pixels {
            if let Some(values) = self.pixel_values(pixel.location) {
                builder.push(values, pixel.label)?;
            }
        }
        Ok(builder.build())
    }
}
