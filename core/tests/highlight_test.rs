//! Fill applied to the changed quantities, checked in the saved package

mod common;

use common::{cell_style, delivery, package_part, sheet_xml, TestWorkspace};
use matdiff_core::export::{highlight, HIGHLIGHT_COLOR};
use matdiff_core::loader::read_workbook;
use matdiff_core::{HighlightStatus, MatdiffCore};

fn run_changed_report(workspace: &TestWorkspace) -> std::path::PathBuf {
    let current = workspace.write_snapshot(
        "current.xlsx",
        &[
            delivery("M1", "Bolt", (2024, 1, 1), 10.0),
            delivery("M2", "Nut", (2024, 1, 1), 3.0),
            delivery("M9", "Rivet", (2024, 5, 1), 1.0),
        ],
    );
    let previous = workspace.write_snapshot(
        "previous.xlsx",
        &[
            delivery("M1", "Bolt", (2024, 1, 1), 5.0),
            delivery("M2", "Nut", (2024, 1, 1), 4.0),
            delivery("M8", "Pin", (2024, 5, 1), 1.0),
        ],
    );
    let destination = workspace.report_path();
    let outcome = MatdiffCore::default()
        .run(&current, &previous, &destination)
        .unwrap();
    assert!(matches!(outcome.highlight, HighlightStatus::Applied(_)));
    destination
}

#[test]
fn test_fill_color_is_registered() {
    let workspace = TestWorkspace::new();
    let report = run_changed_report(&workspace);

    let styles = package_part(&report, "xl/styles.xml");
    assert!(styles.contains(&format!("{HIGHLIGHT_COLOR:06X}")));
    assert!(styles.contains("patternType=\"solid\""));
}

#[test]
fn test_quantity_cells_of_changed_sheet_are_filled() {
    let workspace = TestWorkspace::new();
    let report = run_changed_report(&workspace);
    let changed = sheet_xml(&report, 3);

    let fill = cell_style(&changed, "D2").unwrap();
    assert_ne!(fill, 0);
    for cell in ["E2", "D3", "E3"] {
        assert_eq!(cell_style(&changed, cell), Some(fill), "cell {cell}");
    }

    // Header and key cells keep their own styles
    assert_ne!(cell_style(&changed, "D1"), Some(fill));
    assert_ne!(cell_style(&changed, "E1"), Some(fill));
    assert_ne!(cell_style(&changed, "A2"), Some(fill));
    assert_ne!(cell_style(&changed, "C2"), Some(fill));
}

#[test]
fn test_other_sheets_are_not_filled() {
    let workspace = TestWorkspace::new();
    let report = run_changed_report(&workspace);
    let fill = cell_style(&sheet_xml(&report, 3), "D2").unwrap();

    for position in [1, 2] {
        let xml = sheet_xml(&report, position);
        for cell in ["A1", "D1", "A2", "D2"] {
            assert_ne!(cell_style(&xml, cell), Some(fill), "sheet {position} cell {cell}");
        }
    }
}

#[test]
fn test_highlight_twice_keeps_content() {
    let workspace = TestWorkspace::new();
    let report = run_changed_report(&workspace);
    let before = read_workbook(&report).unwrap();

    let summary = highlight(&report).unwrap();
    assert_eq!(summary.cells.len(), 4);

    let after = read_workbook(&report).unwrap();
    assert_eq!(before.len(), after.len());
    for (b, a) in before.iter().zip(&after) {
        assert_eq!(b.name, a.name);
        assert_eq!(b.rows, a.rows);
    }
}

#[test]
fn test_unhighlighted_report_has_no_fill() {
    let workspace = TestWorkspace::new();
    let current = workspace.write_snapshot(
        "current.xlsx",
        &[delivery("M1", "Bolt", (2024, 1, 1), 10.0)],
    );
    let previous = workspace.write_snapshot(
        "previous.xlsx",
        &[delivery("M1", "Bolt", (2024, 1, 1), 5.0)],
    );
    let destination = workspace.report_path();

    let mut config = matdiff_core::Config::default();
    config.report.highlight = false;
    MatdiffCore::new(config)
        .run(&current, &previous, &destination)
        .unwrap();

    let styles = package_part(&destination, "xl/styles.xml");
    assert!(!styles.contains(&format!("{HIGHLIGHT_COLOR:06X}")));
}
