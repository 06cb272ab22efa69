//! Translation of the user's filter selection into query URLs and shareable address-bar state.
use fide_server::params;
use url::Url;

/// Address-bar parameter names.
const COUNTRY: &str = "country";
const SEARCH: &str = "search";
const SORT: &str = "sort";
const ORDER: &str = "order";
const ORDER_ASC: &str = "asc";
const ORDER_DESC: &str = "desc";

/// The user's current selection. Empty strings are stored as `None`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FilterState {
    pub country: Option<String>,
    pub search_text: Option<String>,
    pub sort_key: String,
    pub sort_ascending: bool,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

impl FilterState {
    #[must_use]
    pub fn new(default_sort_key: &str) -> Self {
        Self {
            country: None,
            search_text: None,
            sort_key: default_sort_key.to_string(),
            sort_ascending: true,
        }
    }

    pub fn set_country(&mut self, country: Option<String>) {
        self.country = non_empty(country);
    }

    pub fn set_search_text(&mut self, text: String) {
        self.search_text = non_empty(Some(text));
    }

    /// Sorting by the current key flips the direction, a new key starts ascending.
    pub fn sort_by(&mut self, key: String) {
        if self.sort_key == key {
            self.sort_ascending = !self.sort_ascending;
        } else {
            self.sort_key = key;
            self.sort_ascending = true;
        }
    }

    /// Encodes the selection for the address bar, without the leading `?`.
    #[must_use]
    pub fn to_address_query(&self) -> String {
        let mut query = url::form_urlencoded::Serializer::new(String::new());
        if let Some(country) = &self.country {
            query.append_pair(COUNTRY, country);
        }
        if let Some(search) = &self.search_text {
            query.append_pair(SEARCH, search);
        }
        query.append_pair(SORT, &self.sort_key);
        query.append_pair(
            ORDER,
            if self.sort_ascending {
                ORDER_ASC
            } else {
                ORDER_DESC
            },
        );
        query.finish()
    }

    /// Decodes an address-bar query. Unknown parameters are ignored and anything but
    /// `order=desc` sorts ascending.
    #[must_use]
    pub fn from_address_query(query: &str, default_sort_key: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut filter = Self::new(default_sort_key);
        let mut order = None;
        let mut has_sort = false;
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                COUNTRY => filter.set_country(Some(value.into_owned())),
                SEARCH => filter.set_search_text(value.into_owned()),
                SORT if !value.is_empty() => {
                    filter.sort_key = value.into_owned();
                    has_sort = true;
                }
                ORDER => order = Some(value.into_owned()),
                _ => {}
            }
        }
        if has_sort {
            filter.sort_ascending = order.as_deref() != Some(ORDER_DESC);
        }
        filter
    }
}

/// Builds the table query for `filter`. Equal inputs always produce equal URLs.
#[must_use]
pub fn build_query_url(base: &Url, page_size: usize, filter: &FilterState) -> Url {
    let mut url = base.clone();
    {
        let mut pairs = url.query_pairs_mut();
        pairs.append_pair(params::SIZE, &page_size.to_string());
        pairs.append_pair(params::EXTRA, params::EXTRA_NEXT_URL);
        if let Some(country) = &filter.country {
            pairs.append_pair(params::COUNTRY_EXACT, country);
        }
        if let Some(search) = &filter.search_text {
            pairs.append_pair(params::SEARCH, search);
        }
        let sort_param = if filter.sort_ascending {
            params::SORT
        } else {
            params::SORT_DESC
        };
        pairs.append_pair(sort_param, &filter.sort_key);
    }
    url
}

/// Continuation links from the API may use plain HTTP; they are always requested over HTTPS.
#[must_use]
pub fn upgrade_to_https(url: &str) -> String {
    match url.strip_prefix("http://") {
        Some(rest) => format!("https://{rest}"),
        None => url.to_string(),
    }
}
