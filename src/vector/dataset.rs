use crate::errors::*;
use crate::vector::sql::Dialect;
use crate::vector::{Geometry, LayerAccess};

/// An opened vector data source: a set of named layers plus an SQL entry point.
pub trait DataSource {
    /// Borrowed handle to one of the source's layers.
    type Layer<'a>: LayerAccess
    where
        Self: 'a;

    /// Layer produced by [`DataSource::execute_sql`], released when dropped.
    type ResultSet<'a>: LayerAccess
    where
        Self: 'a;

    /// Name of the source as known to its driver.
    fn description(&self) -> String;

    /// Short name of the driver that opened the source.
    fn driver_name(&self) -> String;

    fn layer_count(&self) -> usize;

    /// Get layer number `index`, counted from zero.
    fn layer(&mut self, index: usize) -> Result<Self::Layer<'_>>;

    /// Get the layer called `name`.
    fn layer_by_name(&mut self, name: &str) -> Result<Self::Layer<'_>>;

    /// Execute a SQL query against the source.
    ///
    /// Statements without a result set return `None`, which is distinct from
    /// an empty result set.
    ///
    /// # Arguments
    /// * `query`: The SQL query
    /// * `spatial_filter`: Limit results of the query to features that intersect the given
    ///   [`Geometry`]
    /// * `dialect`: The dialect of SQL to use
    fn execute_sql(
        &mut self,
        query: &str,
        spatial_filter: Option<&Geometry>,
        dialect: Dialect,
    ) -> Result<Option<Self::ResultSet<'_>>>;
}
