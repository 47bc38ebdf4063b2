use std::fmt;
use std::str::FromStr;

use ndarray::ArrayView2;

use super::error::ClassificationError;
use super::logreg::{LogRegModel, TrainOptions, train_logreg};
use super::naive_bayes::GaussianNb;
use super::svm::{SvmModel, SvmOptions, train_svm};

/// The interchangeable binary classifiers a fold can be evaluated with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelKind {
    NaiveBayes,
    LogisticRegression,
    Svm,
}

impl ModelKind {
    pub const ALL: [ModelKind; 3] = [
        ModelKind::NaiveBayes,
        ModelKind::LogisticRegression,
        ModelKind::Svm,
    ];

    /// Short name accepted by [`FromStr`].
    pub fn code(self) -> &'static str {
        match self {
            ModelKind::NaiveBayes => "nb",
            ModelKind::LogisticRegression => "lr",
            ModelKind::Svm => "svm",
        }
    }

    /// Fit a fresh classifier of this kind; `positive[i]` marks diabetic rows.
    pub fn fit(
        self,
        x: ArrayView2<'_, f64>,
        positive: &[bool],
    ) -> Result<FittedModel, ClassificationError> {
        Ok(match self {
            ModelKind::NaiveBayes => FittedModel::NaiveBayes(GaussianNb::fit(x, positive)?),
            ModelKind::LogisticRegression => FittedModel::LogisticRegression(train_logreg(
                x,
                positive,
                &TrainOptions::default(),
            )?),
            ModelKind::Svm => {
                FittedModel::Svm(train_svm(x, positive, &SvmOptions::default())?)
            }
        })
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ModelKind::NaiveBayes => "naive Bayes",
            ModelKind::LogisticRegression => "logistic regression",
            ModelKind::Svm => "support vector machine",
        };
        f.write_str(name)
    }
}

impl FromStr for ModelKind {
    type Err = ClassificationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "nb" | "naive-bayes" | "naive_bayes" => Ok(ModelKind::NaiveBayes),
            "lr" | "logistic" | "logistic-regression" | "logistic_regression" => {
                Ok(ModelKind::LogisticRegression)
            }
            "svm" | "svc" => Ok(ModelKind::Svm),
            _ => Err(ClassificationError::UnknownModel(value.to_string())),
        }
    }
}

/// A classifier fitted on one fold's standardized training rows.
#[derive(Debug, Clone, PartialEq)]
pub enum FittedModel {
    NaiveBayes(GaussianNb),
    LogisticRegression(LogRegModel),
    Svm(SvmModel),
}

impl FittedModel {
    /// Probability of the diabetic class for each row.
    pub fn predict_proba(&self, x: ArrayView2<'_, f64>) -> Vec<f64> {
        match self {
            FittedModel::NaiveBayes(model) => model.predict_proba(x),
            FittedModel::LogisticRegression(model) => model.predict_proba(x),
            FittedModel::Svm(model) => model.predict_proba(x),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_short_and_long_names() {
        assert_eq!("nb".parse::<ModelKind>().unwrap(), ModelKind::NaiveBayes);
        assert_eq!(" LR ".parse::<ModelKind>().unwrap(), ModelKind::LogisticRegression);
        assert_eq!("svm".parse::<ModelKind>().unwrap(), ModelKind::Svm);
        for kind in ModelKind::ALL {
            assert_eq!(kind.code().parse::<ModelKind>().unwrap(), kind);
        }
    }

    #[test]
    fn unknown_name_is_reported() {
        assert_eq!(
            "forest".parse::<ModelKind>(),
            Err(ClassificationError::UnknownModel("forest".to_string()))
        );
    }
}
