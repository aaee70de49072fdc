mod integration {
    mod compare_tests;
    mod config_tests;
    mod ingest_tests;
    mod pipeline_tests;
    mod report_tests;
    mod store_tests;
}
