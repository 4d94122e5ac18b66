//! HTTP fetcher for the NYCU enrollment board
//!
//! The board is an ASP.NET WebForms page: choosing an exam type or a
//! department posts the whole form back and returns the re-rendered page.
//! `PortalFetcher` replays those postbacks directly, one department at a
//! time, with a bounded per-request timeout instead of fixed sleeps.

use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::parse::{Page, SelectOption, DEPARTMENT_SELECT, EXAM_TYPE_SELECT, STUDENT_TABLE};
use super::{FetchError, FetchOutcome, Fetcher};
use crate::data::DepartmentTable;

/// Landing page of the enrollment board
pub const DEFAULT_BASE_URL: &str = "https://enroll-ust.nycu.edu.tw/";

/// Exam type whose departments are tracked
pub const DEFAULT_EXAM_TYPE: &str = "ab6e8d7a-9f7b-4e6c-91eb-31ebfd5c6e52";

/// Upper bound on any single request
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

const EVENT_TARGET: &str = "__EVENTTARGET";
const EVENT_ARGUMENT: &str = "__EVENTARGUMENT";

/// Where and what to fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortalConfig {
    /// URL of the board's landing page (the form posts back to it)
    pub base_url: String,
    /// Value of the exam type option to select
    pub exam_type: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            exam_type: DEFAULT_EXAM_TYPE.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Fetches every department's table through form postbacks
#[derive(Debug, Clone)]
pub struct PortalFetcher {
    /// HTTP client with a cookie store for the session
    http_client: Client,
    config: PortalConfig,
}

impl PortalFetcher {
    /// Creates a fetcher with its own cookie-carrying session
    pub fn new(config: PortalConfig) -> Result<Self, FetchError> {
        let http_client = Client::builder()
            .cookie_store(true)
            .timeout(config.timeout)
            .user_agent(concat!("enrollq/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http_client,
            config,
        })
    }

    /// Loads the landing page
    async fn landing_page(&self) -> Result<Page, FetchError> {
        let body = self
            .http_client
            .get(&self.config.base_url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Page::parse(&body)
    }

    /// Posts the form back as if `target` had changed to the given values
    async fn post_back(
        &self,
        page: &Page,
        target: &str,
        values: &[(&str, &str)],
    ) -> Result<Page, FetchError> {
        let mut form: Vec<(&str, &str)> = page
            .hidden_fields
            .iter()
            .filter(|(name, _)| name != EVENT_TARGET && name != EVENT_ARGUMENT)
            .map(|(name, value)| (name.as_str(), value.as_str()))
            .collect();
        form.push((EVENT_TARGET, target));
        form.push((EVENT_ARGUMENT, ""));
        form.extend_from_slice(values);

        let body = self
            .http_client
            .post(&self.config.base_url)
            .form(&form)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Page::parse(&body)
    }

    /// Reads one department, selecting it first unless it already is.
    ///
    /// Returns the page to continue from along with the table.
    async fn fetch_department(
        &self,
        page: &Page,
        department: &SelectOption,
    ) -> Result<(Page, DepartmentTable), FetchError> {
        let page = if page.selected_department.as_deref() == Some(department.value.as_str()) {
            page.clone()
        } else {
            self.post_back(
                page,
                DEPARTMENT_SELECT,
                &[
                    (EXAM_TYPE_SELECT, self.config.exam_type.as_str()),
                    (DEPARTMENT_SELECT, department.value.as_str()),
                ],
            )
            .await?
        };

        if page.selected_department.as_deref() != Some(department.value.as_str()) {
            return Err(FetchError::SelectionIgnored(department.value.clone()));
        }

        match page.table.clone() {
            Some(table) => Ok((page, table)),
            None => Err(FetchError::MissingElement(STUDENT_TABLE)),
        }
    }
}

impl Fetcher for PortalFetcher {
    async fn fetch_all(&self) -> Result<FetchOutcome, FetchError> {
        let landing = self.landing_page().await?;
        if !landing
            .exam_types
            .iter()
            .any(|option| option.value == self.config.exam_type)
        {
            return Err(FetchError::ExamTypeUnavailable(self.config.exam_type.clone()));
        }

        let mut page = self
            .post_back(
                &landing,
                EXAM_TYPE_SELECT,
                &[(EXAM_TYPE_SELECT, self.config.exam_type.as_str())],
            )
            .await?;

        let departments = page.departments.clone();
        if departments.is_empty() {
            return Err(FetchError::MissingElement(DEPARTMENT_SELECT));
        }
        info!(count = departments.len(), "found departments");

        let mut outcome = FetchOutcome::default();
        for (index, department) in departments.iter().enumerate() {
            debug!(
                "processing department {}/{}: {}",
                index + 1,
                departments.len(),
                department.text
            );

            match self.fetch_department(&page, department).await {
                Ok((next, table)) => {
                    debug!(department = %department.text, rows = table.len(), "table read");
                    outcome.tables.insert(department.text.clone(), table);
                    page = next;
                }
                Err(e) => {
                    warn!(department = %department.text, error = %e, "skipping department");
                    outcome.failed.push(department.text.clone());
                }
            }
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Status;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    const LANDING: &str = r#"<html><body><form method="post">
        <input type="hidden" name="__VIEWSTATE" value="vs0" />
        <input type="hidden" name="__EVENTTARGET" value="" />
        <select id="ddlExamType" name="ddlExamType">
          <option value="">請選擇</option>
          <option value="ab6e8d7a-9f7b-4e6c-91eb-31ebfd5c6e52">碩士班</option>
        </select>
        </form></body></html>"#;

    fn department_page(selected: &str, table: Option<&str>) -> String {
        let option = |value: &str, text: &str| {
            let marker = if value == selected { " selected=\"selected\"" } else { "" };
            format!("<option value=\"{}\"{}>{}</option>", value, marker, text)
        };
        format!(
            r#"<html><body><form method="post">
            <input type="hidden" name="__VIEWSTATE" value="vs-{selected}" />
            <select id="ddlExamType" name="ddlExamType">
              <option selected="selected" value="ab6e8d7a-9f7b-4e6c-91eb-31ebfd5c6e52">碩士班</option>
            </select>
            <select id="ddlExamList" name="ddlExamList">{}{}{}</select>
            {}
            </form></body></html>"#,
            option("d1", "資工"),
            option("d2", "電機"),
            option("d3", "機械"),
            table.unwrap_or(""),
        )
    }

    fn table(rows: &[(&str, &str)]) -> String {
        let mut html = String::from(
            "<table id=\"dgUserList\"><tr><td>考生編號</td><td>姓名</td><td>名次</td><td>狀態</td></tr>",
        );
        for (exam, status) in rows {
            html.push_str(&format!(
                "<tr><td>{}</td><td>n{}</td><td>-</td><td>{}</td></tr>",
                exam, exam, status
            ));
        }
        html.push_str("</table>");
        html
    }

    /// How the canned board behaves
    #[derive(Clone, Copy, PartialEq)]
    enum Board {
        /// Serves every department as requested
        Normal,
        /// Does not offer the tracked exam type
        WithoutExamType,
        /// Re-renders the first department for every postback
        IgnoresSelection,
    }

    /// Picks a response body for a request the way the board would
    fn respond(request: &str, board: Board) -> String {
        if request.starts_with("GET") {
            return if board == Board::WithoutExamType {
                LANDING.replace("ab6e8d7a-9f7b-4e6c-91eb-31ebfd5c6e52", "other")
            } else {
                LANDING.to_string()
            };
        }
        if request.contains("__EVENTTARGET=ddlExamType") || board == Board::IgnoresSelection {
            return department_page("d1", Some(&table(&[("1", "正取"), ("2", "備取")])));
        }
        if request.contains("ddlExamList=d2") {
            return department_page("d2", Some(&table(&[("3", ""), ("4", "放棄")])));
        }
        // d3 renders without a table
        department_page("d3", None)
    }

    async fn read_request(stream: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = stream.read(&mut chunk).await.expect("Should read request");
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf).to_string();
            if let Some(header_end) = text.find("\r\n\r\n") {
                let content_length = text[..header_end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if buf.len() >= header_end + 4 + content_length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).to_string()
    }

    /// Serves canned board pages on a local port, returning its base URL
    async fn spawn_board(board: Board) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("Should bind");
        let addr = listener.local_addr().expect("Should have address");

        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                let request = read_request(&mut stream).await;
                let body = respond(&request, board);
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });

        format!("http://{}/", addr)
    }

    fn fetcher_for(base_url: String) -> PortalFetcher {
        PortalFetcher::new(PortalConfig {
            base_url,
            timeout: Duration::from_secs(5),
            ..PortalConfig::default()
        })
        .expect("Client should build")
    }

    #[test]
    fn test_default_config_targets_enrollment_board() {
        let config = PortalConfig::default();
        assert!(config.base_url.contains("enroll-ust.nycu.edu.tw"));
        assert_eq!(config.exam_type, DEFAULT_EXAM_TYPE);
        assert_eq!(config.timeout, Duration::from_secs(20));
    }

    #[tokio::test]
    async fn test_fetch_all_reads_each_department_and_skips_broken_ones() {
        let base_url = spawn_board(Board::Normal).await;
        let fetcher = fetcher_for(base_url);

        let outcome = fetcher.fetch_all().await.expect("Fetch should succeed");

        assert_eq!(outcome.failed, vec!["機械".to_string()]);
        assert_eq!(outcome.tables.len(), 2);

        let cs = &outcome.tables["資工"];
        let exams: Vec<&str> = cs.iter().map(|s| s.exam_number.as_str()).collect();
        assert_eq!(exams, vec!["1", "2"]);

        let ee = &outcome.tables["電機"];
        assert_eq!(ee[0].exam_number, "3");
        assert_eq!(ee[0].status, Status::PhonePending);
        assert_eq!(ee[1].status, Status::GivenUp);
    }

    #[tokio::test]
    async fn test_fetch_all_fails_when_exam_type_missing() {
        let base_url = spawn_board(Board::WithoutExamType).await;
        let fetcher = fetcher_for(base_url);

        let err = fetcher.fetch_all().await.expect_err("Fetch should fail");

        assert!(matches!(err, FetchError::ExamTypeUnavailable(_)));
    }

    #[tokio::test]
    async fn test_department_not_switched_by_board_is_reported_failed() {
        let base_url = spawn_board(Board::IgnoresSelection).await;
        let fetcher = fetcher_for(base_url);

        let outcome = fetcher.fetch_all().await.expect("Fetch should succeed");

        assert_eq!(outcome.tables.keys().collect::<Vec<_>>(), vec!["資工"]);
        assert_eq!(outcome.failed, vec!["電機".to_string(), "機械".to_string()]);
    }

    #[tokio::test]
    async fn test_fetch_all_fails_when_site_unreachable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("Should bind");
        let addr = listener.local_addr().expect("Should have address");
        drop(listener);

        let fetcher = fetcher_for(format!("http://{}/", addr));
        let err = fetcher.fetch_all().await.expect_err("Fetch should fail");

        assert!(matches!(err, FetchError::Http(_)));
    }
}
