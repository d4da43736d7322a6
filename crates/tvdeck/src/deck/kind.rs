use eframe::egui;

/// Gap between paginated items, in reference pixels.
pub const ITEM_GAP: f32 = 16.0;

/// The closed set of slide types the TV screens know how to draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlideKind {
    Opening,
    Overview,
    Attendance,
    EmployeeSummary,
    BankStatus,
    TaskBoard,
    Ranking,
    Announcement,
    Closing,
}

impl SlideKind {
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::all().iter().copied().find(|k| k.tag() == tag)
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Self::Opening => "opening",
            Self::Overview => "overview",
            Self::Attendance => "attendance",
            Self::EmployeeSummary => "employee-summary",
            Self::BankStatus => "bank-status",
            Self::TaskBoard => "task-board",
            Self::Ranking => "ranking",
            Self::Announcement => "announcement",
            Self::Closing => "closing",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Opening => "Opening",
            Self::Overview => "Overview",
            Self::Attendance => "Attendance",
            Self::EmployeeSummary => "Employee summary",
            Self::BankStatus => "Bank status",
            Self::TaskBoard => "Task board",
            Self::Ranking => "Ranking",
            Self::Announcement => "Announcement",
            Self::Closing => "Closing",
        }
    }

    /// Size of one item card at the 1920x1080 reference scale.
    /// `None` for kinds that never paginate.
    pub fn item_footprint(&self) -> Option<egui::Vec2> {
        match self {
            Self::Overview => Some(egui::vec2(400.0, 150.0)),
            Self::Attendance => Some(egui::vec2(260.0, 120.0)),
            Self::EmployeeSummary => Some(egui::vec2(560.0, 96.0)),
            Self::BankStatus => Some(egui::vec2(360.0, 170.0)),
            Self::TaskBoard => Some(egui::vec2(1760.0, 60.0)),
            Self::Ranking => Some(egui::vec2(1760.0, 72.0)),
            Self::Opening | Self::Announcement | Self::Closing => None,
        }
    }

    pub fn all() -> &'static [SlideKind] {
        &[
            SlideKind::Opening,
            SlideKind::Overview,
            SlideKind::Attendance,
            SlideKind::EmployeeSummary,
            SlideKind::BankStatus,
            SlideKind::TaskBoard,
            SlideKind::Ranking,
            SlideKind::Announcement,
            SlideKind::Closing,
        ]
    }
}

impl std::fmt::Display for SlideKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_round_trip_through_catalogue() {
        for kind in SlideKind::all() {
            assert_eq!(SlideKind::from_tag(kind.tag()), Some(*kind));
        }
        assert_eq!(SlideKind::from_tag("not-a-real-type"), None);
        assert_eq!(SlideKind::from_tag("Overview"), None);
    }

    #[test]
    fn test_only_list_kinds_have_footprints() {
        assert!(SlideKind::Attendance.item_footprint().is_some());
        assert!(SlideKind::TaskBoard.item_footprint().is_some());
        assert!(SlideKind::Opening.item_footprint().is_none());
        assert!(SlideKind::Announcement.item_footprint().is_none());
    }
}
