// src/common/pagination.rs

use serde::Serialize;
use utoipa::ToSchema;

/// Uma página do resultado filtrado. `page` começa em 1.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub per_page: usize,
    pub total_items: usize,
    pub total_pages: usize,
}

impl<T> Page<T> {
    /// Fatia `items` na página pedida. `per_page` é limitado a `1..=max_per_page`
    /// e páginas fora do intervalo voltam vazias, com os totais corretos.
    pub fn paginate(items: Vec<T>, page: usize, per_page: usize, max_per_page: usize) -> Self {
        let per_page = per_page.clamp(1, max_per_page.max(1));
        let page = page.max(1);
        let total_items = items.len();
        let total_pages = total_items.div_ceil(per_page);

        let start = (page - 1).saturating_mul(per_page);
        let items: Vec<T> = items.into_iter().skip(start).take(per_page).collect();

        Self { items, page, per_page, total_items, total_pages }
    }
}
