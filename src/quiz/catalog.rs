use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::store::{DocumentStore, Filter};

pub const QUESTIONS: &str = "quizquestion";
pub const THEME: &str = "jurassic";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[default]
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// Lenient parse: anything unrecognized means "no difficulty filter",
    /// never an error.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "easy" => Some(Self::Easy),
            "medium" => Some(Self::Medium),
            "hard" => Some(Self::Hard),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }
}

/// Reference data; seeded once and never mutated. Every field defaults so
/// a partially-seeded or malformed record still comes back in canonical
/// shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizQuestion {
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub answer_index: u32,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default = "default_theme")]
    pub theme: String,
}

pub(crate) fn default_theme() -> String {
    THEME.to_string()
}

fn question(
    text: &str,
    options: [&str; 4],
    answer_index: u32,
    difficulty: Difficulty,
) -> QuizQuestion {
    QuizQuestion {
        question: text.to_string(),
        options: options.iter().map(|s| s.to_string()).collect(),
        answer_index,
        difficulty,
        theme: default_theme(),
    }
}

/// The canonical jurassic question set: three questions per difficulty.
pub fn jurassic_questions() -> Vec<QuizQuestion> {
    use Difficulty::{Easy, Hard, Medium};
    vec![
        question(
            "Ano ang panahon kung kailan namuhay ang mga dinosaur?",
            ["Jurassic", "Cenozoic", "Precambrian", "Holocene"],
            0,
            Easy,
        ),
        question(
            "Alin sa mga ito ang isang carnivorous dinosaur?",
            [
                "Triceratops",
                "Brachiosaurus",
                "Stegosaurus",
                "Tyrannosaurus Rex",
            ],
            3,
            Easy,
        ),
        question(
            "Ano ang tawag sa taong nag-aaral ng fossils?",
            ["Archaeologist", "Paleontologist", "Geologist", "Biologist"],
            1,
            Easy,
        ),
        question(
            "Anong uri ng dinosaur si Velociraptor?",
            ["Herbivore", "Carnivore", "Omnivore", "Insectivore"],
            1,
            Medium,
        ),
        question(
            "Saan natagpuan ang unang fossil ng Archaeopteryx?",
            ["China", "Germany", "USA", "Argentina"],
            1,
            Medium,
        ),
        question(
            "Anong katangian ang tumutulong sa mga sauropods na kumain ng matataas na halaman?",
            [
                "Mahahabang leeg",
                "Matutulis na ngipin",
                "Malalaking pakpak",
                "Matitibay na sungay",
            ],
            0,
            Medium,
        ),
        question(
            "Alin ang mas nauna: Triassic, Jurassic, o Cretaceous?",
            ["Jurassic", "Cretaceous", "Triassic", "Pare-pareho"],
            2,
            Hard,
        ),
        question(
            "Ano ang pangunahing teorya sa pagkalipol ng mga dinosaur?",
            [
                "Pagbaha",
                "Pagputok ng bulkan",
                "Pagbangga ng asteroid",
                "Matinding lamig",
            ],
            2,
            Hard,
        ),
        question(
            "Anong fossil resin ang madalas nakabihag ng mga insekto mula pa noong sinaunang panahon?",
            ["Tar", "Amber", "Coal", "Quartz"],
            1,
            Hard,
        ),
    ]
}

/// Seed the canonical set if no jurassic questions exist yet. Called on
/// every quiz request, so it must stay cheap and idempotent. Two callers
/// racing past the count can both seed; that duplication is accepted.
pub async fn ensure_seeded(store: &dyn DocumentStore) -> anyhow::Result<()> {
    let count = store
        .count(QUESTIONS, &Filter::new().eq("theme", THEME))
        .await?;
    if count == 0 {
        for q in jurassic_questions() {
            let doc = serde_json::to_value(&q).context("serialize question")?;
            store.insert(QUESTIONS, doc).await?;
        }
        info!("seeded jurassic question set");
    }
    Ok(())
}

/// Fetch questions filtered by theme and, optionally, difficulty, in
/// storage-native order. No sort is requested, so the order is whatever
/// the storage layer yields.
pub async fn get_questions(
    store: &dyn DocumentStore,
    difficulty: Option<Difficulty>,
    limit: Option<i64>,
) -> anyhow::Result<Vec<QuizQuestion>> {
    let mut filter = Filter::new().eq("theme", THEME);
    if let Some(difficulty) = difficulty {
        filter = filter.eq("difficulty", difficulty.as_str());
    }
    let docs = store.find_many(QUESTIONS, &filter, None, limit).await?;
    docs.into_iter()
        .map(|doc| serde_json::from_value(doc).context("deserialize question"))
        .collect()
}
