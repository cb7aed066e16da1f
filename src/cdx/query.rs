use chrono::NaiveDateTime;

/// Date layout of the `from`/`to` CDX query parameters.
const QUERY_DATE_FORMAT: &str = "%Y%m%d";

/// Caller-supplied CDX query
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestConfig {
    /// URL pattern, e.g. `example.com/*`
    pub url: String,
    /// Raw filter expressions such as `=status:200` or `mimetype:text/html`
    pub filters: Vec<String>,
    /// Maximum number of results, 0 for unlimited
    pub limit: u32,
    /// Column the server collapses duplicate captures on
    pub collapse_column: Option<String>,
    /// Fetch only the first page and skip page-count discovery
    pub single_page: bool,
    pub from_date: Option<NaiveDateTime>,
    pub to_date: Option<NaiveDateTime>,
}

impl RequestConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filters.push(filter.into());
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_collapse_column(mut self, column: impl Into<String>) -> Self {
        self.collapse_column = Some(column.into());
        self
    }

    pub fn with_single_page(mut self, single_page: bool) -> Self {
        self.single_page = single_page;
        self
    }

    pub fn with_from_date(mut self, from: NaiveDateTime) -> Self {
        self.from_date = Some(from);
        self
    }

    pub fn with_to_date(mut self, to: NaiveDateTime) -> Self {
        self.to_date = Some(to);
        self
    }

    /// True once `count` results satisfy a non-zero limit.
    pub fn limit_reached(&self, count: usize) -> bool {
        self.limit != 0 && count >= self.limit as usize
    }

    /// Build the CDX query URL for `page` against `index_url`
    /// (`<index-server>/<snapshot>-index`).
    ///
    /// Parameter order is fixed: `url`, `output`, `limit`, `collapse`, each
    /// `filter`, `from`, `to`, `page`. The URL pattern and filters are passed
    /// through verbatim.
    pub fn query_url(&self, index_url: &str, page: u32) -> String {
        let mut url = format!("{index_url}?url={}&output=json", self.url);

        if self.limit != 0 {
            url.push_str(&format!("&limit={}", self.limit));
        }

        if let Some(column) = self.collapse_column.as_deref().filter(|c| !c.is_empty()) {
            url.push_str(&format!("&collapse={column}"));
        }

        for filter in self.filters.iter().filter(|f| !f.is_empty()) {
            url.push_str(&format!("&filter={filter}"));
        }

        if let Some(from) = self.from_date {
            url.push_str(&format!("&from={}", from.format(QUERY_DATE_FORMAT)));
        }

        if let Some(to) = self.to_date {
            url.push_str(&format!("&to={}", to.format(QUERY_DATE_FORMAT)));
        }

        if !self.single_page {
            url.push_str(&format!("&page={page}"));
        }

        url
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const INDEX: &str = "https://index.commoncrawl.org/CC-MAIN-2024-30-index";

    fn midnight(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn minimal_query_has_url_output_and_page() {
        let config = RequestConfig::new("example.com/*");
        assert_eq!(
            config.query_url(INDEX, 0),
            "https://index.commoncrawl.org/CC-MAIN-2024-30-index?url=example.com/*&output=json&page=0"
        );
    }

    #[test]
    fn full_query_follows_parameter_order() {
        let config = RequestConfig::new("example.com/*")
            .with_limit(25)
            .with_collapse_column("urlkey")
            .with_filter("=status:200")
            .with_filter("mimetype:text/html")
            .with_from_date(midnight(2024, 7, 1))
            .with_to_date(midnight(2024, 7, 31));

        assert_eq!(
            config.query_url(INDEX, 3),
            "https://index.commoncrawl.org/CC-MAIN-2024-30-index?url=example.com/*&output=json\
             &limit=25&collapse=urlkey&filter==status:200&filter=mimetype:text/html\
             &from=20240701&to=20240731&page=3"
        );
    }

    #[test]
    fn single_page_omits_page_and_zero_limit_omits_limit() {
        let config = RequestConfig::new("example.com")
            .with_single_page(true)
            .with_filter("")
            .with_collapse_column("");
        assert_eq!(
            config.query_url(INDEX, 7),
            format!("{INDEX}?url=example.com&output=json")
        );
    }

    #[test]
    fn query_url_is_deterministic() {
        let config = RequestConfig::new("example.com/*")
            .with_limit(5)
            .with_filter("=status:200");
        assert_eq!(config.query_url(INDEX, 2), config.query_url(INDEX, 2));
        assert_ne!(config.query_url(INDEX, 2), config.query_url(INDEX, 3));
    }

    #[test]
    fn limit_reached_ignores_zero_limit() {
        assert!(!RequestConfig::new("x").limit_reached(1_000_000));
        let config = RequestConfig::new("x").with_limit(5);
        assert!(!config.limit_reached(4));
        assert!(config.limit_reached(5));
        assert!(config.limit_reached(6));
    }
}
