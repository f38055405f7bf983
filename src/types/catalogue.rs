use serde::Deserialize;
use utoipa::IntoParams;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CatalogueQuery {
    pub search: Option<String>,
    /// `brand-new`, `toks`, `grade-a`, or `all`.
    pub category: Option<String>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
}
