pub mod bloom;
pub mod distribution;
pub mod fallback;
pub mod loaders;
pub mod question;
pub mod report;

pub use bloom::BloomCategory;
pub use distribution::{
    AnalyzedQuestion, BloomDistribution, Difficulty, DistributionDataset,
    DistributionQuestionDetail,
};
pub use fallback::fallback_dataset;
pub use loaders::{load_all_datasets, load_dataset, DatasetContent, NamedDataset};
pub use question::{
    Criterion, QuestionKind, QuestionRecord, QuestionTotals, QuestionType, RubricDataset,
    RubricQuestionDetail,
};
pub use report::{
    CategoryAggregate, CategoryShare, CognitiveViewModel, QuestionTypeCounts, ReportMeta,
    ReportViewModel, ScoredQuestion,
};
