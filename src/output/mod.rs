pub mod formatter;

pub use formatter::{
    format_age, format_fairness_report, format_job_list, format_job_status, format_results_json,
    format_results_table, format_results_tsv, format_score, should_use_colors,
};
