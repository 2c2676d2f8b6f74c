//! Application-level configuration loading, including the question bank.

use std::{collections::HashSet, env, fs, io::ErrorKind, path::PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

use crate::state::{
    channel::DEFAULT_CHANNEL_NAME,
    game::{Answer, Question},
    state_machine::StagePolicy,
};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "TRIVIA_BOARD_CONFIG_PATH";
/// Environment variable that overrides the data directory.
const DATA_DIR_ENV: &str = "TRIVIA_BOARD_DATA_DIR";
/// Directory holding the persisted cells when nothing else is configured.
const DEFAULT_DATA_DIR: &str = "data";

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    questions: Vec<Question>,
    stage_policy: StagePolicy,
    channel_name: String,
    data_dir: PathBuf,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to the built-in question bank.
    pub fn load() -> Self {
        let path = resolve_config_path();
        let config = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        questions = app_config.questions.len(),
                        policy = ?app_config.stage_policy,
                        "loaded configuration"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        };

        match env::var_os(DATA_DIR_ENV).filter(|dir| !dir.is_empty()) {
            Some(dir) => config.with_data_dir(dir),
            None => config,
        }
    }

    /// Question bank in display order.
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    /// Look up a bank question by id.
    pub fn question(&self, id: u32) -> Option<&Question> {
        self.questions.iter().find(|question| question.id == id)
    }

    /// Stage rules applied to controller operations.
    pub fn stage_policy(&self) -> StagePolicy {
        self.stage_policy
    }

    /// Broadcast channel name shared by both cells.
    pub fn channel_name(&self) -> &str {
        &self.channel_name
    }

    /// Directory of the file-backed store.
    pub fn data_dir(&self) -> &PathBuf {
        &self.data_dir
    }

    /// Copy with a different stage policy.
    pub fn with_stage_policy(self, stage_policy: StagePolicy) -> Self {
        Self {
            stage_policy,
            ..self
        }
    }

    /// Copy with a different data directory.
    pub fn with_data_dir(self, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..self
        }
    }

    /// Copy with a different question bank. Entries are checked as on load.
    pub fn with_questions(self, questions: Vec<Question>) -> Self {
        Self {
            questions: accepted_questions(questions),
            ..self
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            questions: default_questions(),
            stage_policy: StagePolicy::default(),
            channel_name: DEFAULT_CHANNEL_NAME.into(),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    #[serde(default)]
    questions: Option<Vec<Question>>,
    #[serde(default)]
    stage_policy: StagePolicy,
    #[serde(default)]
    channel_name: Option<String>,
    #[serde(default)]
    data_dir: Option<PathBuf>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let questions = match value.questions {
            Some(questions) => accepted_questions(questions),
            None => default_questions(),
        };
        Self {
            questions,
            stage_policy: value.stage_policy,
            channel_name: value
                .channel_name
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| DEFAULT_CHANNEL_NAME.into()),
            data_dir: value
                .data_dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
        }
    }
}

/// Drop bank entries that break the question rules or reuse an id or a text.
///
/// The active question is matched by text, so texts must be unique too.
fn accepted_questions(questions: Vec<Question>) -> Vec<Question> {
    let mut seen = HashSet::new();
    let mut texts = HashSet::new();
    questions
        .into_iter()
        .filter(|question| {
            if let Err(err) = question.validate() {
                warn!(id = question.id, error = %err, "skipping invalid question");
                return false;
            }
            if !seen.insert(question.id) {
                warn!(id = question.id, "skipping question with duplicate id");
                return false;
            }
            if !texts.insert(question.text.clone()) {
                warn!(
                    id = question.id,
                    text = %question.text,
                    "skipping question with duplicate text"
                );
                return false;
            }
            true
        })
        .collect()
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

fn bank_entry(id: u32, text: &str, answers: [&str; 10]) -> Question {
    Question {
        id,
        text: text.into(),
        answers: answers
            .into_iter()
            .zip(1u8..)
            .map(|(text, position)| Answer {
                position,
                text: text.into(),
            })
            .collect(),
    }
}

/// Built-in question bank shipped with the binary.
fn default_questions() -> Vec<Question> {
    vec![
        bank_entry(
            1,
            "IMDb Top 10 Movies",
            [
                "The Shawshank Redemption",
                "The Godfather",
                "The Dark Knight",
                "The Godfather Part II",
                "12 Angry Men",
                "The Lord of the Rings: The Return of the King",
                "Schindler's List",
                "The Lord of the Rings: The Fellowship of the Ring",
                "The Good, the Bad and the Ugly",
                "Fight Club",
            ],
        ),
        bank_entry(
            2,
            "Billboard's Top 10 Artists of 2024",
            [
                "Taylor Swift",
                "Morgan Wallen",
                "Zach Bryan",
                "Drake",
                "Sabrina Carpenter",
                "Billie Eilish",
                "SZA",
                "Luke Combs",
                "Post Malone",
                "Kendrick Lamar",
            ],
        ),
        bank_entry(
            3,
            "Most popular New Year's resolutions in the US for 2025",
            [
                "Save more money",
                "Eat healthier",
                "Get more exercise",
                "Lose weight",
                "Spend more time with family and friends",
                "Quit smoking",
                "Reduce spendings",
                "Spend less time on social media",
                "Improve performance at work",
                "Reduce stress",
            ],
        ),
        bank_entry(
            4,
            "Top 10 Highest-Grossing Movies Of 2024",
            [
                "Inside Out 2",
                "Deadpool & Wolverine",
                "Wicked",
                "Despicable Me 4",
                "Moana 2",
                "Beetlejuice Beetlejuice",
                "Dune: Part Two",
                "Twisters",
                "Godzilla x Kong: The New Empire",
                "Kung Fu Panda 4",
            ],
        ),
        bank_entry(
            5,
            "Most searched people of 2024?",
            [
                "Donald Trump",
                "Kate Middleton",
                "Kamala Harris",
                "Imane Khelif",
                "Joe Biden",
                "Mike Tyson",
                "JD Vance",
                "Lamine Yamal",
                "Simone Biles",
                "Diddy",
            ],
        ),
        bank_entry(
            6,
            "Most searched slang words of 2024?",
            [
                "Demure",
                "Sigma",
                "Skibidi",
                "Hawk tuah",
                "Sobriquet",
                "Shmaltz",
                "Sen",
                "Katz",
                "Oeuvre",
                "Preen",
            ],
        ),
        bank_entry(
            7,
            "Какие неологизмы искали в 2024 году?",
            [
                "Докс",
                "Скуф",
                "Пикми",
                "Нормис",
                "Вонёнизм",
                "Сигма",
                "Анк",
                "Делулу",
                "Пов",
                "Тюбик",
            ],
        ),
    ]
}
