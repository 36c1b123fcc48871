//! Error types for feature tables, splitting, and sampling.

/// Errors from table construction, splitting, and raster sampling.
#[derive(Debug, thiserror::Error)]
pub enum TableError {
    /// Returned when a schema is built from zero attribute names.
    #[error("schema must declare at least one attribute")]
    EmptySchema,

    /// Returned when the same attribute name appears twice in a schema.
    #[error("attribute \"{name}\" is declared more than once")]
    DuplicateAttribute {
        /// The repeated attribute name.
        name: String,
    },

    /// Returned when a row does not carry exactly the schema's attributes.
    #[error("row {row_index} has {got} attribute values, schema declares {expected}")]
    SchemaMismatch {
        /// Number of attributes in the schema.
        expected: usize,
        /// Number of values in the offending row.
        got: usize,
        /// Zero-based index of the offending row.
        row_index: usize,
    },

    /// Returned when a vector built against one schema is added to a table with another.
    #[error("row {row_index} was built against schema [{got}], table declares [{expected}]")]
    ForeignSchema {
        /// Comma-separated attribute names of the table schema.
        expected: String,
        /// Comma-separated attribute names of the vector schema.
        got: String,
        /// Zero-based index of the offending row.
        row_index: usize,
    },

    /// Returned when an attribute name is looked up but not declared.
    #[error("attribute \"{name}\" is not part of the schema")]
    UnknownAttribute {
        /// The requested attribute name.
        name: String,
    },

    /// Returned when a feature vector contains a missing or non-finite value.
    #[error("attribute \"{attribute}\" has non-finite value {value}")]
    NonFiniteValue {
        /// Name of the attribute holding the value.
        attribute: String,
        /// The offending value.
        value: f64,
    },

    /// Returned when the train proportion is NaN.
    #[error("train proportion must be a number, got {proportion}")]
    InvalidProportion {
        /// The invalid proportion.
        proportion: f64,
    },

    /// Returned when a per-class sample count is zero.
    #[error("sample count for class {class} must be at least 1, got {count}")]
    InvalidSampleCount {
        /// The class label with the invalid count.
        class: i32,
        /// The requested count.
        count: usize,
    },

    /// Returned when the sampling scale is not a positive finite number.
    #[error("sampling scale must be positive and finite, got {scale}")]
    InvalidScale {
        /// The invalid scale.
        scale: f64,
    },

    /// Returned when a region has inverted or non-finite bounds.
    #[error("invalid region [{min_x}, {min_y}, {max_x}, {max_y}]")]
    InvalidRegion {
        /// Western bound.
        min_x: f64,
        /// Southern bound.
        min_y: f64,
        /// Eastern bound.
        max_x: f64,
        /// Northern bound.
        max_y: f64,
    },

    /// Returned when raster cell data does not match the declared grid size.
    #[error("raster band \"{band}\" has {got} cells, grid is {width}x{height}")]
    GridSizeMismatch {
        /// Band name (or "labels" for a label grid).
        band: String,
        /// Grid width in pixels.
        width: usize,
        /// Grid height in pixels.
        height: usize,
        /// Actual number of cells supplied.
        got: usize,
    },

    /// Returned when two rasters that must share a grid do not.
    #[error("raster grids differ: {reason}")]
    GridGeometryMismatch {
        /// Which part of the geometry differs.
        reason: String,
    },

    /// Returned when the pixel size of a grid is not positive and finite.
    #[error("pixel size must be positive and finite, got {pixel_size}")]
    InvalidPixelSize {
        /// The invalid pixel size.
        pixel_size: f64,
    },
}
