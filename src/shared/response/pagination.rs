use crate::shared::config::QueryConfig;

/// A breakdown page. The query fetches one row more than `limit` to learn
/// whether another page exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: usize,
    pub offset: usize,
}

impl Page {
    /// Clamps `limit` into `1..=max_breakdown_limit`.
    pub fn new(limit: Option<usize>, offset: Option<usize>, config: &QueryConfig) -> Self {
        let max = config.max_breakdown_limit.max(1);
        Self {
            limit: limit
                .unwrap_or(config.default_breakdown_limit)
                .clamp(1, max),
            offset: offset.unwrap_or(0),
        }
    }

    pub fn fetch_limit(&self) -> usize {
        self.limit + 1
    }

    pub fn next(&self) -> Page {
        Page {
            limit: self.limit,
            offset: self.offset + self.limit,
        }
    }

    /// Drops the look-ahead row, returning whether there was one.
    pub fn trim<T>(&self, rows: &mut Vec<T>) -> bool {
        let has_more = rows.len() > self.limit;
        rows.truncate(self.limit);
        has_more
    }
}

/// Link to the page after `page`, or `None` on the last page. Existing `limit` and
/// `offset` parameters in `base` are replaced; `offset=0` is never written.
pub fn next_link(base: Option<&str>, page: &Page, has_more: bool) -> Option<String> {
    if !has_more {
        return None;
    }
    let next = page.next();
    let base = base.unwrap_or("");
    let (path, query) = base.split_once('?').unwrap_or((base, ""));

    let mut params: Vec<String> = query
        .split('&')
        .filter(|p| !p.is_empty())
        .filter(|p| {
            let key = p.split_once('=').map_or(*p, |(k, _)| k);
            key != "limit" && key != "offset"
        })
        .map(str::to_string)
        .collect();
    params.push(format!("limit={}", next.limit));
    if next.offset != 0 {
        params.push(format!("offset={}", next.offset));
    }

    Some(format!("{path}?{}", params.join("&")))
}
