//! Upstream series fetching.
//!
//! Raw series are supplied by a Solr-style search endpoint that returns CSV. The fetcher is
//! invoked only on a cache miss, scoped to the (project, source, field projection) of the
//! request and sorted ascending on the leading field.

use crate::error::DecimatorError;

use async_trait::async_trait;
use url::Url;

/// A raw tabular upstream response: named columns and rows of text cells.
#[derive(Clone, Debug, PartialEq)]
pub struct RawTable {
    /// Column names, from the response header row
    pub columns: Vec<String>,
    /// Rows of unparsed cells
    pub rows: Vec<Vec<String>>,
}

/// Trait for upstream series fetchers.
///
/// This forms the contract between the pipeline and the upstream data source.
#[async_trait]
pub trait UpstreamFetcher: Send + Sync {
    /// Fetch the raw series for a (project, source, fields) triple.
    ///
    /// The returned rows are sorted ascending by `fields[0]` and restricted server-side to the
    /// given project and source identifiers.
    async fn fetch(
        &self,
        project: &str,
        source_id: &str,
        fields: &[String],
    ) -> Result<RawTable, DecimatorError>;
}

/// Upstream fetcher for a Solr search endpoint.
#[derive(Debug)]
pub struct SolrFetcher {
    client: reqwest::Client,
    base_url: Url,
}

impl SolrFetcher {
    /// Create a new Solr fetcher.
    ///
    /// # Arguments
    ///
    /// * `base_url`: Base URL of the Solr select endpoint
    pub fn new(base_url: Url) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    /// Build the select URL for a (project, source, fields) triple.
    ///
    /// The projection and the equality filter on project and source are passed through
    /// unmodified; results are requested as CSV sorted ascending on the leading field.
    fn build_url(&self, project: &str, source_id: &str, fields: &[String]) -> Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair("facet", "on")
            .append_pair("wt", "csv")
            .append_pair("rows", "10000000")
            .append_pair("sort", &format!("{} asc", fields[0]))
            .append_pair("fl", &fields.join(","))
            .append_pair(
                "q",
                &format!(
                    "datatype:data AND project:{} AND source_id: {}",
                    project, source_id
                ),
            );
        url
    }
}

#[async_trait]
impl UpstreamFetcher for SolrFetcher {
    async fn fetch(
        &self,
        project: &str,
        source_id: &str,
        fields: &[String],
    ) -> Result<RawTable, DecimatorError> {
        let url = self.build_url(project, source_id, fields);
        tracing::debug!(%url, "fetching series from upstream");
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(DecimatorError::UpstreamStatus {
                status: response.status().as_u16(),
            });
        }
        let text = response.text().await?;
        parse_csv(&text)
    }
}

/// Parse an upstream CSV payload into a [RawTable].
///
/// The first line is the header; blank lines are skipped. Upstream payloads carry plain numeric
/// and timestamp cells, so no quoting rules apply.
pub fn parse_csv(text: &str) -> Result<RawTable, DecimatorError> {
    let mut lines = text.lines();
    let header = lines.next().ok_or_else(|| DecimatorError::UpstreamMalformed {
        reason: "empty response".to_string(),
    })?;
    let columns: Vec<String> = header
        .split(',')
        .map(|column| column.trim().to_string())
        .collect();
    if columns.iter().all(|column| column.is_empty()) {
        return Err(DecimatorError::UpstreamMalformed {
            reason: "response has no header row".to_string(),
        });
    }
    let mut rows = Vec::new();
    for line in lines {
        if line.is_empty() {
            continue;
        }
        rows.push(line.split(',').map(|cell| cell.trim().to_string()).collect());
    }
    Ok(RawTable { columns, rows })
}
