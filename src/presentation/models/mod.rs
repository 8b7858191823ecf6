use poem_openapi::Enum;

use crate::domain::{
    errors::StateError,
    models::{AttemptOutcome, CampaignStatus},
};

#[derive(Enum, Copy, Clone, Debug, Eq, PartialEq)]
pub enum CampaignStatusKind {
    #[oai(rename = "created")]
    Created,
    #[oai(rename = "launched")]
    Launched,
    #[oai(rename = "completed")]
    Completed,
}

impl CampaignStatusKind {
    pub fn label(&self) -> &'static str {
        match self {
            CampaignStatusKind::Created => "Создана",
            CampaignStatusKind::Launched => "Запущена",
            CampaignStatusKind::Completed => "Завершена",
        }
    }
}

impl From<CampaignStatus> for CampaignStatusKind {
    fn from(value: CampaignStatus) -> Self {
        match value {
            CampaignStatus::Created => CampaignStatusKind::Created,
            CampaignStatus::Launched => CampaignStatusKind::Launched,
            CampaignStatus::Completed => CampaignStatusKind::Completed,
        }
    }
}

#[derive(Enum, Copy, Clone, Debug, Eq, PartialEq)]
pub enum AttemptOutcomeKind {
    #[oai(rename = "success")]
    Success,
    #[oai(rename = "failure")]
    Failure,
}

impl AttemptOutcomeKind {
    pub fn label(&self) -> &'static str {
        match self {
            AttemptOutcomeKind::Success => "Успешно",
            AttemptOutcomeKind::Failure => "Не успешно",
        }
    }
}

impl From<AttemptOutcome> for AttemptOutcomeKind {
    fn from(value: AttemptOutcome) -> Self {
        match value {
            AttemptOutcome::Success => AttemptOutcomeKind::Success,
            AttemptOutcome::Failure => AttemptOutcomeKind::Failure,
        }
    }
}

#[derive(Enum, Copy, Clone, Debug, Eq, PartialEq)]
pub enum LaunchOutcomeKind {
    #[oai(rename = "launched")]
    Launched,
    #[oai(rename = "already_launched")]
    AlreadyLaunched,
    #[oai(rename = "already_completed")]
    AlreadyCompleted,
    #[oai(rename = "disabled")]
    Disabled,
    #[oai(rename = "not_launched")]
    NotLaunched,
    #[oai(rename = "run_in_progress")]
    RunInProgress,
    #[oai(rename = "changed_during_launch")]
    ChangedDuringLaunch,
}

impl LaunchOutcomeKind {
    pub fn label(&self) -> &'static str {
        match self {
            LaunchOutcomeKind::Launched => "Рассылка запущена",
            LaunchOutcomeKind::AlreadyLaunched => "Рассылка уже запущена",
            LaunchOutcomeKind::AlreadyCompleted => "Рассылка уже завершена",
            LaunchOutcomeKind::Disabled => "Рассылка отключена",
            LaunchOutcomeKind::NotLaunched => "Рассылка ещё не запущена",
            LaunchOutcomeKind::RunInProgress => "Рассылка выполняется",
            LaunchOutcomeKind::ChangedDuringLaunch => "Рассылка изменилась во время запуска",
        }
    }
}

impl From<StateError> for LaunchOutcomeKind {
    fn from(value: StateError) -> Self {
        match value {
            StateError::AlreadyLaunched => LaunchOutcomeKind::AlreadyLaunched,
            StateError::AlreadyCompleted => LaunchOutcomeKind::AlreadyCompleted,
            StateError::Disabled => LaunchOutcomeKind::Disabled,
            StateError::NotLaunched => LaunchOutcomeKind::NotLaunched,
            StateError::RunInProgress => LaunchOutcomeKind::RunInProgress,
            StateError::ChangedDuringLaunch => LaunchOutcomeKind::ChangedDuringLaunch,
        }
    }
}
