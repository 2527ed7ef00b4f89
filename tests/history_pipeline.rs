//! End-to-end tests: search pipeline recording into a real SQLite file.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeDelta, Utc};
use mathnote::{MathNoteConfig, MathNoteError, MathNoteService, SqliteHistoryRepository};
use mathnote_search::{
    HistoryStore, RawResult, SearchConfig, SearchError, SearchManager, SearchProvider,
    SearchSource,
};
use wiremock::matchers::{method, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

enum Behaviour {
    Hits(Vec<RawResult>),
    Hang,
}

struct FakeProvider {
    source: SearchSource,
    behaviour: Behaviour,
}

#[async_trait]
impl SearchProvider for FakeProvider {
    async fn fetch(&self, _query: &str, max_results: usize) -> Result<Vec<RawResult>, SearchError> {
        match &self.behaviour {
            Behaviour::Hits(hits) => Ok(hits.iter().take(max_results).cloned().collect()),
            Behaviour::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(vec![])
            }
        }
    }

    fn source(&self) -> SearchSource {
        self.source
    }
}

fn hit(title: &str, url: &str, snippet: &str) -> RawResult {
    RawResult {
        title: title.into(),
        url: url.into(),
        snippet: snippet.into(),
        math_hint: false,
    }
}

fn open_repo(dir: &tempfile::TempDir) -> Arc<SqliteHistoryRepository> {
    Arc::new(
        SqliteHistoryRepository::open(&dir.path().join("history.db")).expect("open repository"),
    )
}

fn service(
    providers: Vec<FakeProvider>,
    repo: Arc<SqliteHistoryRepository>,
) -> MathNoteService {
    let config = SearchConfig {
        timeout_seconds: 2,
        cache_ttl_seconds: 0,
        ..Default::default()
    };
    let map: HashMap<SearchSource, Arc<dyn SearchProvider>> = providers
        .into_iter()
        .map(|p| (p.source, Arc::new(p) as Arc<dyn SearchProvider>))
        .collect();
    let store: Arc<dyn HistoryStore> = repo.clone();
    let manager = SearchManager::with_providers(config, map, Some(store)).expect("manager");
    MathNoteService::from_parts(manager, repo, 30)
}

fn linear_algebra_providers() -> Vec<FakeProvider> {
    vec![
        FakeProvider {
            source: SearchSource::Google,
            behaviour: Behaviour::Hits(vec![
                hit("线性代数 - 维基百科", "https://zh.wikipedia.org/wiki/线性代数", "线性代数是关于向量空间和线性映射的一个数学分支"),
                hit("线性代数入门", "https://example.edu/la/intro", "矩阵与行列式"),
                hit("MIT 18.06 Linear Algebra", "https://ocw.mit.edu/18-06", "linear algebra lectures"),
            ]),
        },
        FakeProvider {
            source: SearchSource::Bing,
            behaviour: Behaviour::Hits(vec![
                hit("线性代数入门", "http://www.example.edu/la/intro/", "矩阵与行列式"),
                hit("线性代数习题", "https://example.cn/exercises", "特征值与特征向量"),
                hit("Khan Academy", "https://www.khanacademy.org/math/linear-algebra", "Vectors and spaces"),
            ]),
        },
    ]
}

#[tokio::test]
async fn linear_algebra_search_persists_one_row() {
    let dir = tempfile::TempDir::new().expect("temp dir");
    let repo = open_repo(&dir);
    let service = service(linear_algebra_providers(), Arc::clone(&repo));

    let results = service
        .search("线性代数", &[SearchSource::Google, SearchSource::Bing], Some(4))
        .await
        .expect("search succeeds");

    assert_eq!(results.len(), 4);
    for pair in results.windows(2) {
        assert!(pair[0].relevance_score() >= pair[1].relevance_score());
    }

    let rows = service.recent_history(10).expect("history");
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert!(row.id.is_some());
    assert_eq!(row.query_text, "线性代数");
    assert_eq!(row.result_count, 5);
    assert_eq!(row.top_result_url.as_deref(), Some(results[0].url()));

    let by_keyword = service.history_for_keyword("线性代数").expect("keyword lookup");
    assert_eq!(by_keyword.len(), 1);
    assert_eq!(by_keyword[0].id, row.id);
}

#[tokio::test(start_paused = true)]
async fn all_providers_timing_out_leaves_no_row() {
    let dir = tempfile::TempDir::new().expect("temp dir");
    let repo = open_repo(&dir);
    let providers = [SearchSource::Google, SearchSource::Bing, SearchSource::Arxiv]
        .into_iter()
        .map(|source| FakeProvider {
            source,
            behaviour: Behaviour::Hang,
        })
        .collect();
    let service = service(providers, Arc::clone(&repo));

    let err = service.search("线性代数", &[], None).await.unwrap_err();
    assert!(matches!(
        err,
        MathNoteError::Search(SearchError::AllSourcesUnavailable(_))
    ));
    assert_eq!(repo.count().expect("count"), 0);
}

#[tokio::test]
async fn each_search_adds_a_row_newest_first() {
    let dir = tempfile::TempDir::new().expect("temp dir");
    let repo = open_repo(&dir);
    let service = service(linear_algebra_providers(), Arc::clone(&repo));

    service.search("线性代数", &[], None).await.expect("first");
    tokio::time::sleep(Duration::from_millis(5)).await;
    service
        .search("linear algebra lectures", &[], None)
        .await
        .expect("second");

    let rows = service.recent_history(10).expect("history");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].query_text, "linear algebra lectures");
    assert_eq!(service.recent_history(1).expect("limited").len(), 1);
    assert!(service.recent_history(0).expect("zero").is_empty());
}

#[tokio::test]
async fn delete_older_than_twice_returns_n_then_zero() {
    let dir = tempfile::TempDir::new().expect("temp dir");
    let repo = open_repo(&dir);
    let service = service(linear_algebra_providers(), Arc::clone(&repo));

    for query in ["线性代数", "matrix", "eigenvalue"] {
        service.search(query, &[], None).await.expect("search");
    }
    assert_eq!(repo.count().expect("count"), 3);

    let cutoff = Utc::now() + TimeDelta::seconds(1);
    assert_eq!(service.prune_history_before(cutoff).expect("first prune"), 3);
    assert_eq!(service.prune_history_before(cutoff).expect("second prune"), 0);
}

const ARXIV_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title type="html">ArXiv Query: search_query=all:eigenvalue</title>
  <entry>
    <id>http://arxiv.org/abs/2101.00001v1</id>
    <title>Eigenvalue bounds for random matrices</title>
    <summary>Sharp eigenvalue bounds for Wigner matrices.</summary>
  </entry>
  <entry>
    <id>http://arxiv.org/abs/2101.00001v2</id>
    <title>Eigenvalue bounds for random matrices (v2)</title>
    <summary>Revised version.</summary>
  </entry>
  <entry>
    <id>http://arxiv.org/abs/2102.00002v1</id>
    <title>Spectral gaps of graphs</title>
    <summary>Eigenvalue gaps of graph Laplacians.</summary>
  </entry>
</feed>"#;

#[tokio::test]
async fn configured_service_searches_arxiv_and_records_history() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("search_query", "all:eigenvalue"))
        .respond_with(ResponseTemplate::new(200).set_body_string(ARXIV_FEED))
        .mount(&server)
        .await;

    let dir = tempfile::TempDir::new().expect("temp dir");
    let mut config = MathNoteConfig::default();
    config.search.sources = vec![SearchSource::Arxiv];
    config.search.arxiv_base_url = Some(server.uri());
    config.history.db_path = Some(dir.path().join("history.db"));

    let service = MathNoteService::open(&config).expect("open service");
    let results = service.search("eigenvalue", &[], None).await.expect("search");

    // The two versions of 2101.00001 collapse into one result.
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.source() == SearchSource::Arxiv));
    assert!(results.iter().all(|r| r.math_content_detected()));

    let rows = service.recent_history(5).expect("history");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].result_count, 2);
    assert_eq!(rows[0].query_text, "eigenvalue");
}
