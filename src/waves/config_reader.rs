use crate::waves::*;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct OutputSettings {
    #[serde(rename = "surveyName")]
    pub survey_name: String,
    #[serde(rename = "outputDirectory")]
    pub output_directory: Option<String>,
    /// Explicit per-question chart titles. A question without an override
    /// is titled by its identifier.
    #[serde(rename = "titleOverrides")]
    pub title_overrides: Option<BTreeMap<String, String>>,
}

impl OutputSettings {
    pub fn chart_title(&self, question: &str) -> String {
        self.title_overrides
            .as_ref()
            .and_then(|m| m.get(question))
            .cloned()
            .unwrap_or_else(|| question.to_string())
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct WaveSource {
    pub provider: String,
    /// The wave identifier, e.g. "ns20200625". The fielding date derives
    /// from it.
    pub wave: String,
    /// Explicit location of the data file. When absent, the directory-name
    /// convention `<wave>/<wave>.<ext>` applies, relative to the config
    /// file's directory.
    #[serde(rename = "filePath")]
    pub file_path: Option<String>,
    #[serde(rename = "weightColumn")]
    pub weight_column: Option<String>,
    #[serde(rename = "excelWorksheetName")]
    pub excel_worksheet_name: Option<String>,
}

impl WaveSource {
    pub fn weight_column(&self) -> String {
        self.weight_column
            .clone()
            .unwrap_or_else(|| "weight".to_string())
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonSpec {
    pub wave: String,
    pub question: String,
    #[serde(rename = "groupBy")]
    pub group_by: String,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct PresenceSource {
    #[serde(rename = "filePath")]
    pub file_path: String,
    /// Size of the header-skip region before the wave header row.
    #[serde(rename = "skipRows")]
    pub skip_rows: Option<u64>,
}

impl PresenceSource {
    pub fn skip_rows(&self) -> usize {
        self.skip_rows.unwrap_or(5) as usize
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct SurveyConfig {
    #[serde(rename = "outputSettings")]
    pub output_settings: OutputSettings,
    #[serde(rename = "waveSources")]
    pub wave_sources: Vec<WaveSource>,
    pub questions: Vec<String>,
    pub comparisons: Option<Vec<ComparisonSpec>>,
    #[serde(rename = "presenceSources")]
    pub presence_sources: Option<Vec<PresenceSource>>,
}

pub fn read_summary(path: String) -> BWavesResult<JSValue> {
    let contents = fs::read_to_string(path.clone()).context(OpeningJsonSnafu { path })?;
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    Ok(js)
}
