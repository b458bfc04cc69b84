use datapipeline_aws::config::AppConfig;

// Both cases live in one test: test threads share the process environment,
// and this binary is the only one that mutates it.
#[test]
fn test_from_env_reads_the_region() {
    unsafe { std::env::set_var("AWS_REGION", "eu-central-1") };
    let config = AppConfig::from_env().expect("AWS_REGION is set");
    assert_eq!(config.aws_region, "eu-central-1");

    unsafe { std::env::remove_var("AWS_REGION") };
    let err = AppConfig::from_env().expect_err("AWS_REGION is unset");
    assert!(err.to_string().contains("AWS_REGION"));
}

#[test]
fn test_config_is_cloneable() {
    let config = AppConfig {
        aws_region: "ap-southeast-2".to_string(),
    };
    let copy = config.clone();
    assert_eq!(copy.aws_region, "ap-southeast-2");
}
