use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use crate::config::Settings;
use crate::error::{InvalidPatternError, PipelineError};
use crate::fetch::{self, Fetcher, Page};
use crate::parser::extract::Record;
use crate::parser::format::{report_line, Escaping};
use crate::parser::pattern::Pattern;
use crate::parser::process_page;
use crate::sentiment::Classifier;

#[derive(Debug, Clone, Copy, Default)]
pub struct OutputOptions {
    pub escaping: Escaping,
    pub json: bool,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub titles: usize,
    pub links: usize,
    pub labelled: usize,
}

impl Summary {
    pub fn print(&self) {
        eprintln!("Scraping done: {} titles, {} links.", self.titles, self.links);
        if self.labelled > 0 {
            eprintln!("Sentiment attached to {} records.", self.labelled);
        }
    }
}

#[derive(Serialize)]
struct JsonLine<'a> {
    #[serde(flatten)]
    record: &'a Record,
    #[serde(skip_serializing_if = "Option::is_none")]
    sentiment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sentiment_error: Option<String>,
}

/// Where a run reads its markup from.
#[derive(Debug, Clone)]
pub enum Source {
    Url(String),
    File(PathBuf),
}

/// One validated run: the pattern is compiled before anything is fetched or read.
#[derive(Debug)]
pub struct ScanRequest {
    source: Source,
    pattern: Pattern,
}

impl ScanRequest {
    pub fn new(source: Source, pattern: &str) -> Result<Self, InvalidPatternError> {
        let pattern = Pattern::new(pattern)?;
        Ok(Self { source, pattern })
    }

    pub async fn run(&self, settings: &Settings) -> Result<Vec<Record>, PipelineError> {
        match &self.source {
            Source::Url(url) => {
                let fetcher = Fetcher::new(settings)?;
                fetch_and_extract(&fetcher, url, &self.pattern).await
            }
            Source::File(path) => extract_file(path, &self.pattern),
        }
    }
}

pub async fn fetch_and_extract(
    fetcher: &Fetcher,
    url: &str,
    pattern: &Pattern,
) -> Result<Vec<Record>, PipelineError> {
    let page = fetcher.fetch(url).await?;
    extract_page(&page, pattern)
}

pub fn extract_file(path: &Path, pattern: &Pattern) -> Result<Vec<Record>, PipelineError> {
    let page = fetch::read_file(path)?;
    extract_page(&page, pattern)
}

fn extract_page(page: &Page, pattern: &Pattern) -> Result<Vec<Record>, PipelineError> {
    let records = process_page(&page.body, page.charset.as_deref(), pattern)?;
    info!("Extracted {} records matching {:?}", records.len(), pattern.as_str());
    Ok(records)
}

/// One stage-identifying line per failed run.
pub fn report_failure<W: Write>(out: &mut W, err: &PipelineError) -> io::Result<()> {
    writeln!(out, "{}", err)
}

/// Write records in traversal order, optionally followed by their sentiment.
/// A failed classification is reported on its own line and does not stop
/// the remaining records.
pub async fn report<W, C>(
    out: &mut W,
    records: &[Record],
    options: OutputOptions,
    classifier: Option<&C>,
) -> io::Result<Summary>
where
    W: Write,
    C: Classifier,
{
    let mut summary = Summary::default();

    for record in records {
        match record {
            Record::Title { .. } => summary.titles += 1,
            Record::Link { .. } => summary.links += 1,
        }

        let sentiment = match classifier {
            Some(c) => Some(c.classify(record.text()).await),
            None => None,
        };
        if let Some(Err(e)) = &sentiment {
            warn!("Sentiment unavailable for {:?}: {}", record.text(), e);
        }
        if let Some(Ok(_)) = &sentiment {
            summary.labelled += 1;
        }

        if options.json {
            let line = JsonLine {
                record,
                sentiment: sentiment
                    .as_ref()
                    .and_then(|s| s.as_ref().ok())
                    .map(|s| s.label.clone()),
                sentiment_error: sentiment
                    .as_ref()
                    .and_then(|s| s.as_ref().err())
                    .map(|e| e.to_string()),
            };
            writeln!(out, "{}", serde_json::to_string(&line)?)?;
            continue;
        }

        writeln!(out, "{}", report_line(record, options.escaping))?;
        match sentiment {
            Some(Ok(result)) => writeln!(out, "Sentiment: {}", result.label)?,
            Some(Err(e)) => writeln!(out, "Sentiment unavailable: {}", e)?,
            None => {}
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SentimentBridgeError;
    use crate::sentiment::SentimentResult;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PAGE: &str =
        r#"<h1>Hello World</h1><a href="/x">Hello</a><p>Hello but not a link or heading</p>"#;

    /// Labels texts containing "World", fails on everything else.
    struct FakeClassifier;

    impl Classifier for FakeClassifier {
        async fn classify(&self, text: &str) -> Result<SentimentResult, SentimentBridgeError> {
            if text.contains("World") {
                Ok(SentimentResult {
                    text: text.to_string(),
                    label: "POSITIVE".to_string(),
                })
            } else {
                Err(SentimentBridgeError::EmptyOutput {
                    program: "fake".to_string(),
                })
            }
        }
    }

    fn records() -> Vec<Record> {
        process_page(PAGE.as_bytes(), None, &Pattern::new("Hello").unwrap()).unwrap()
    }

    async fn render(options: OutputOptions, classify: bool) -> (String, Summary) {
        let mut out = Vec::new();
        let summary = report(
            &mut out,
            &records(),
            options,
            classify.then_some(&FakeClassifier),
        )
        .await
        .unwrap();
        (String::from_utf8(out).unwrap(), summary)
    }

    #[tokio::test]
    async fn plain_report_lines() {
        let (out, summary) = render(OutputOptions::default(), false).await;
        assert_eq!(
            out,
            "Title found: Hello World\nLink found: <a href=\"/x\">Hello</a>\n"
        );
        assert_eq!(summary, Summary { titles: 1, links: 1, labelled: 0 });
    }

    #[tokio::test]
    async fn escaped_report() {
        let options = OutputOptions {
            escaping: Escaping::Html,
            json: false,
        };
        let mut out = Vec::new();
        let records = vec![Record::Link {
            href: "/a?b&c".into(),
            text: "<x>".into(),
        }];
        report(&mut out, &records, options, None::<&FakeClassifier>)
            .await
            .unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Link found: <a href=\"/a?b&amp;c\">&lt;x&gt;</a>\n"
        );
    }

    #[tokio::test]
    async fn sentiment_failure_is_isolated() {
        let (out, summary) = render(OutputOptions::default(), true).await;
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "Title found: Hello World");
        assert_eq!(lines[1], "Sentiment: POSITIVE");
        assert_eq!(lines[2], "Link found: <a href=\"/x\">Hello</a>");
        assert!(lines[3].starts_with("Sentiment unavailable:"));
        assert_eq!(summary.labelled, 1);
        assert_eq!(summary.links, 1);
    }

    #[tokio::test]
    async fn json_lines() {
        let options = OutputOptions {
            json: true,
            ..OutputOptions::default()
        };
        let (out, _) = render(options, true).await;
        let values: Vec<serde_json::Value> = out
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(values.len(), 2);
        assert_eq!(values[0]["kind"], "title");
        assert_eq!(values[0]["level"], 1);
        assert_eq!(values[0]["sentiment"], "POSITIVE");
        assert_eq!(values[1]["kind"], "link");
        assert_eq!(values[1]["href"], "/x");
        assert!(values[1].get("sentiment").is_none());
        assert!(values[1]["sentiment_error"].is_string());
    }

    #[tokio::test]
    async fn fetched_page_is_extracted() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(PAGE))
            .mount(&server)
            .await;

        let fetcher = Fetcher::new(&Settings::default()).unwrap();
        let pattern = Pattern::new("Hello").unwrap();
        let records = fetch_and_extract(&fetcher, &server.uri(), &pattern)
            .await
            .unwrap();
        assert_eq!(records, self::records());
    }

    #[tokio::test]
    async fn unparseable_page_yields_one_message_and_no_records() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0x3c, 0x68, 0xff, 0xfe, 0xfd]))
            .mount(&server)
            .await;

        let fetcher = Fetcher::new(&Settings::default()).unwrap();
        let pattern = Pattern::new("Hello").unwrap();
        let err = fetch_and_extract(&fetcher, &server.uri(), &pattern)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Parse(_)));

        let mut out = Vec::new();
        report_failure(&mut out, &err).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 1);
        assert!(text.starts_with("Parse failed:"));
    }

    #[tokio::test]
    async fn failed_fetch_skips_extraction() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let fetcher = Fetcher::new(&Settings::default()).unwrap();
        let pattern = Pattern::new("Hello").unwrap();
        let err = fetch_and_extract(&fetcher, &server.uri(), &pattern)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Fetch(_)));
        assert!(err.to_string().starts_with("Fetch failed:"));
    }

    #[test]
    fn missing_file_is_a_fetch_stage_failure() {
        let pattern = Pattern::new("x").unwrap();
        let err = extract_file(Path::new("no/such.html"), &pattern).unwrap_err();
        assert!(matches!(err, PipelineError::Fetch(_)));
    }

    #[tokio::test]
    async fn invalid_pattern_is_rejected_before_any_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(PAGE))
            .expect(0)
            .mount(&server)
            .await;

        let err = ScanRequest::new(Source::Url(server.uri()), "[").unwrap_err();
        assert_eq!(err.pattern, "[");
        assert!(err.to_string().starts_with("invalid pattern \"[\""));

        let requests = server.received_requests().await.unwrap();
        assert!(requests.is_empty());
    }

    #[tokio::test]
    async fn scan_request_fetches_and_extracts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(PAGE))
            .expect(1)
            .mount(&server)
            .await;

        let request = ScanRequest::new(Source::Url(server.uri()), "Hello").unwrap();
        let records = request.run(&Settings::default()).await.unwrap();
        assert_eq!(records, self::records());
    }

    #[tokio::test]
    async fn content_type_charset_is_honoured() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(b"<h1>Caf\xE9 cr\xE8me</h1>".to_vec(), "text/html; charset=ISO-8859-1"),
            )
            .mount(&server)
            .await;

        let request = ScanRequest::new(Source::Url(server.uri()), "Caf").unwrap();
        let records = request.run(&Settings::default()).await.unwrap();
        assert_eq!(
            records,
            vec![Record::Title {
                text: "Café crème".to_string(),
                level: 1,
            }]
        );
    }

    #[tokio::test]
    async fn scan_request_reads_local_files() {
        let path = std::env::temp_dir().join(format!("page_grep_scan_{}.html", std::process::id()));
        std::fs::write(&path, PAGE).unwrap();
        let request = ScanRequest::new(Source::File(path.clone()), "World").unwrap();
        let records = request.run(&Settings::default()).await;
        std::fs::remove_file(&path).unwrap();
        assert_eq!(records.unwrap().len(), 1);
    }
}
