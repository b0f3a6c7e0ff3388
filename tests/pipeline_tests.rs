#[cfg(test)]
mod tests {
    use realty_extract::aggregation::{visual_blocks, Grouping};
    use realty_extract::classification::{classify, Configuration, ConfigurationThresholds};
    use realty_extract::config::{ColumnConfig, PipelineConfig};
    use parking_lot::Mutex;
    use realty_extract::errors::{error_logging, AppError};
    use realty_extract::pipeline::{columns, Pipeline};
    use realty_extract::rate::rate;
    use realty_extract::records::Table;
    use realty_extract::report::Report;
    use serde_json::json;
    use std::io::Write;
    use std::sync::Arc;
    use tempfile::TempDir;

    /// Log sink shared between a test and its tracing subscriber
    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl CapturedLogs {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock()).into_owned()
        }
    }

    fn alpha_table() -> Table {
        Table::from_json_str(
            &json!([
                {"Description": "Flat carpet 550 sq.ft", "Consideration": 6682500, "Property": "Alpha", "Village": "Baner"},
                {"Description": "Flat carpet 820 sq.ft", "Consideration": "94,09,500", "Property": "Alpha", "Village": "Baner"},
                {"Description": "Shop, no area given", "Consideration": 1000000, "Property": "Alpha", "Village": "Baner"}
            ])
            .to_string(),
        )
        .unwrap()
    }

    fn run(table: &Table, config: PipelineConfig) -> realty_extract::pipeline::PipelineOutput {
        Pipeline::new(config)
            .unwrap()
            .run(table, &ColumnConfig::default())
            .unwrap()
    }

    #[test]
    fn test_alpha_end_to_end() {
        let output = run(&alpha_table(), PipelineConfig::default());

        assert_eq!(output.rows.len(), 3);
        assert_eq!(output.rows[0][columns::CONFIGURATION], json!("1BHK"));
        assert_eq!(output.rows[0][columns::RATE], json!(9000.0));
        assert_eq!(output.rows[0][columns::SALEABLE_AREA_SQFT], json!(742.5));
        assert_eq!(output.rows[1][columns::CONFIGURATION], json!("2BHK"));
        assert_eq!(output.rows[1][columns::RATE], json!(8500.0));
        assert_eq!(output.rows[2][columns::CONFIGURATION], json!("unresolved"));
        assert_eq!(output.rows[2][columns::RATE], json!(0.0));
        assert_eq!(output.rows[2]["Village"], json!("Baner"));

        assert_eq!(output.unresolved_count(), 1);
        assert_eq!(output.summary.len(), 2);
        let one_bhk = &output.summary[0];
        assert_eq!(one_bhk.property, "Alpha");
        assert_eq!(one_bhk.configuration, Configuration::OneBhk);
        assert_eq!(one_bhk.count, 1);
        assert_eq!(one_bhk.min_rate, 9000.0);
        assert_eq!(one_bhk.mode_rate, 9000.0);
        let two_bhk = &output.summary[1];
        assert_eq!(two_bhk.configuration, Configuration::TwoBhk);
        assert_eq!(two_bhk.avg_rate, 8500.0);
        assert_eq!(two_bhk.area_sqft, 820.0);
    }

    #[test]
    fn test_missing_column_lists_present_columns() {
        let table = Table::from_json_str(r#"[{"Description": "550 sq.ft", "Amount": 1}]"#).unwrap();
        let err = Pipeline::new(PipelineConfig::default())
            .unwrap()
            .run(&table, &ColumnConfig::default())
            .unwrap_err();

        match &err {
            AppError::MissingColumn { present, .. } => {
                assert_eq!(present, &vec!["Description".to_string(), "Amount".to_string()]);
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(err.to_string().starts_with("[MISSING_COLUMN]"));
    }

    #[test]
    fn test_missing_column_is_logged_once() {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            let table = Table::from_json_str(r#"[{"Description": "550 sq.ft"}]"#).unwrap();
            let err = Pipeline::new(PipelineConfig::default())
                .unwrap()
                .run(&table, &ColumnConfig::default())
                .unwrap_err();
            error_logging::log_pipeline_error(&err);
        });

        let text = logs.text();
        assert_eq!(
            text.matches("Required input column missing").count(),
            1,
            "unexpected log output:\n{text}"
        );
        assert_eq!(text.matches("ERROR").count(), 1);
    }

    #[test]
    fn test_custom_column_names() {
        let table = Table::from_json_str(
            r#"[{"Deed Text": "45 sq.mt", "Price": 6000000, "Project": "Beta"}]"#,
        )
        .unwrap();
        let columns = ColumnConfig {
            description: "deed text".to_string(),
            consideration: "PRICE".to_string(),
            property: "project".to_string(),
        };
        let output = Pipeline::new(PipelineConfig::default())
            .unwrap()
            .run(&table, &columns)
            .unwrap();
        assert_eq!(output.metrics[0].property, "Beta");
        assert_eq!(output.metrics[0].carpet_area_sqmt, 45.0);
    }

    #[test]
    fn test_loading_factor_changes_rate() {
        let table = alpha_table();
        let config = PipelineConfig {
            loading_factor: 1.5,
            ..Default::default()
        };
        let output = run(&table, config);
        // 550 * 1.5 = 825 saleable
        assert_eq!(output.metrics[0].saleable_area_sqft, 825.0);
        assert_eq!(output.metrics[0].rate, 8100.0);
    }

    #[test]
    fn test_group_by_area_and_blocks() {
        let table = Table::from_json_str(
            &json!([
                {"Description": "550 sq.ft", "Consideration": 6682500, "Property": "Alpha"},
                {"Description": "580 sq.ft", "Consideration": 7047000, "Property": "Alpha"},
                {"Description": "550 sq.ft", "Consideration": 6682500, "Property": "Alpha"},
                {"Description": "900 sq.ft", "Consideration": 9720000, "Property": "Alpha"},
                {"Description": "700 sq.ft", "Consideration": 7087500, "Property": "Beta"}
            ])
            .to_string(),
        )
        .unwrap();
        let config = PipelineConfig {
            group_by_area: true,
            ..Default::default()
        };
        let output = run(&table, config);
        let pipeline_grouping = Pipeline::new(PipelineConfig {
            group_by_area: true,
            ..Default::default()
        })
        .unwrap()
        .grouping();
        assert_eq!(pipeline_grouping, Grouping::PropertyConfigurationArea);

        let areas: Vec<f64> = output.summary.iter().map(|r| r.area_sqft).collect();
        assert_eq!(areas, vec![550.0, 580.0, 900.0, 700.0]);
        assert_eq!(output.summary[0].count, 2);

        let blocks = visual_blocks(&output.summary);
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[0].len, 2);
        assert_eq!(blocks[2].property, "Beta");
    }

    #[test]
    fn test_summary_is_deterministic_across_input_order() {
        let table = alpha_table();
        let mut reversed = table.clone();
        reversed.rows.reverse();

        let forward = run(&table, PipelineConfig::default());
        let backward = run(&reversed, PipelineConfig::default());
        assert_eq!(forward.summary, backward.summary);
    }

    #[test]
    fn test_classification_and_rate_properties() {
        let thresholds = ConfigurationThresholds::default();
        assert_eq!(classify(0.0, &thresholds), Configuration::Unresolved);
        assert_eq!(classify(599.999, &thresholds), Configuration::OneBhk);
        assert_eq!(classify(600.0, &thresholds), Configuration::TwoBhk);
        assert_eq!(classify(1100.0, &thresholds), Configuration::FourBhk);
        assert_eq!(rate(9_000_000.0, 0.0), 0.0);
        assert_eq!(rate(9_000_000.0, 1000.0), 9000.0);
    }

    #[test]
    fn test_report_file_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("report.json");
        let output = run(&alpha_table(), PipelineConfig::default());

        let report = Report::new(output, "Configuration: test".to_string());
        report.write_to(&path).unwrap();

        let loaded = Report::read_from(&path).unwrap();
        assert_eq!(loaded.records, 3);
        assert_eq!(loaded.unresolved, 1);
        assert_eq!(loaded.summary, report.summary);
        assert_eq!(loaded.blocks, report.blocks);
    }
}
