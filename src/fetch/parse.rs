//! HTML extraction for enrollment board pages
//!
//! Turns a page body into an owned [`Page`] so nothing borrowed from the
//! parsed document outlives this module.

use scraper::{ElementRef, Html, Selector};

use super::FetchError;
use crate::data::{DepartmentTable, StudentRecord};

/// Id of the exam type dropdown
pub const EXAM_TYPE_SELECT: &str = "ddlExamType";
/// Id of the department dropdown
pub const DEPARTMENT_SELECT: &str = "ddlExamList";
/// Id of the student table
pub const STUDENT_TABLE: &str = "dgUserList";

/// First header cell of the student table
const HEADER_CELL: &str = "考生編號";

/// Minimum number of cells in a student row (exam number, name, _, status)
const MIN_ROW_CELLS: usize = 4;

/// One `<option>` of a dropdown
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOption {
    /// Submitted value
    pub value: String,
    /// Visible text
    pub text: String,
}

/// Everything the fetcher needs from one page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    /// Hidden form inputs (`__VIEWSTATE` and friends) to echo back on postback
    pub hidden_fields: Vec<(String, String)>,
    /// Options of the exam type dropdown
    pub exam_types: Vec<SelectOption>,
    /// Options of the department dropdown
    pub departments: Vec<SelectOption>,
    /// Value of the department currently selected
    pub selected_department: Option<String>,
    /// The student table, if the page has one
    pub table: Option<DepartmentTable>,
}

impl Page {
    /// Parses a page body
    pub fn parse(body: &str) -> Result<Self, FetchError> {
        let document = Html::parse_document(body);
        let (departments, selected_department) = select_options(&document, DEPARTMENT_SELECT)?;
        let (exam_types, _) = select_options(&document, EXAM_TYPE_SELECT)?;

        Ok(Self {
            hidden_fields: hidden_fields(&document)?,
            exam_types,
            departments,
            selected_department,
            table: student_table(&document)?,
        })
    }
}

fn selector(css: &str) -> Result<Selector, FetchError> {
    Selector::parse(css).map_err(|_| FetchError::Selector(css.to_string()))
}

fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Collects `<input type="hidden">` name/value pairs
fn hidden_fields(document: &Html) -> Result<Vec<(String, String)>, FetchError> {
    let inputs = selector("input[type=\"hidden\"]")?;

    Ok(document
        .select(&inputs)
        .filter_map(|input| {
            let name = input.value().attr("name")?;
            let value = input.value().attr("value").unwrap_or_default();
            Some((name.to_string(), value.to_string()))
        })
        .collect())
}

/// Reads a dropdown's options and the value of the selected one.
///
/// Without an explicit `selected` attribute the first option is selected,
/// as a browser would do.
fn select_options(
    document: &Html,
    id: &str,
) -> Result<(Vec<SelectOption>, Option<String>), FetchError> {
    let options = selector(&format!("select#{} option", id))?;

    let mut selected = None;
    let mut parsed = Vec::new();
    for option in document.select(&options) {
        let text = text_of(option);
        let value = option
            .value()
            .attr("value")
            .map(str::to_string)
            .unwrap_or_else(|| text.clone());
        if selected.is_none() && option.value().attr("selected").is_some() {
            selected = Some(value.clone());
        }
        parsed.push(SelectOption { value, text });
    }

    let selected = selected.or_else(|| parsed.first().map(|o| o.value.clone()));
    Ok((parsed, selected))
}

/// Reads the student table in rank order, skipping the header row
fn student_table(document: &Html) -> Result<Option<DepartmentTable>, FetchError> {
    let tables = selector(&format!("table#{}", STUDENT_TABLE))?;
    let rows = selector("tr")?;
    let cells = selector("td")?;

    let Some(table) = document.select(&tables).next() else {
        return Ok(None);
    };

    let records = table
        .select(&rows)
        .filter_map(|row| {
            let texts: Vec<String> = row.select(&cells).map(text_of).collect();
            if texts.len() < MIN_ROW_CELLS || texts[0] == HEADER_CELL {
                return None;
            }
            Some(StudentRecord::from_cells(&texts[0], &texts[1], &texts[3]))
        })
        .collect();

    Ok(Some(records))
}
