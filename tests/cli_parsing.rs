use clap::Parser;
use regcheck::cli::{Cli, Commands};
use regcheck::domain::models::DistanceMetric;
use std::path::PathBuf;

#[test]
fn test_parse_ingest_urls() {
    let cli = Cli::try_parse_from([
        "regcheck",
        "ingest",
        "https://regulator.example/a.pdf",
        "https://regulator.example/b.pdf",
        "--index",
        "--wait",
        "300",
    ])
    .unwrap();

    match cli.command {
        Commands::Ingest(args) => {
            assert_eq!(args.urls.len(), 2);
            assert!(args.index);
            assert_eq!(args.wait, Some(300));
            assert!(args.chunks_file.is_none());
        }
        _ => panic!("Wrong command"),
    }
}

#[test]
fn test_parse_ingest_chunks_file() {
    let cli = Cli::try_parse_from(["regcheck", "ingest", "--chunks-file", "chunks.json"]).unwrap();
    match cli.command {
        Commands::Ingest(args) => {
            assert!(args.urls.is_empty());
            assert_eq!(args.chunks_file, Some(PathBuf::from("chunks.json")));
        }
        _ => panic!("Wrong command"),
    }
}

#[test]
fn test_ingest_requires_a_source() {
    assert!(Cli::try_parse_from(["regcheck", "ingest"]).is_err());
    assert!(Cli::try_parse_from([
        "regcheck",
        "ingest",
        "https://regulator.example/a.pdf",
        "--chunks-file",
        "chunks.json",
    ])
    .is_err());
}

#[test]
fn test_parse_index_overrides() {
    let cli = Cli::try_parse_from([
        "regcheck",
        "index",
        "--metric",
        "cosine",
        "--m",
        "16",
        "--ef-construction",
        "128",
    ])
    .unwrap();

    match cli.command {
        Commands::Index(args) => {
            assert_eq!(args.metric, Some(DistanceMetric::Cosine));
            assert_eq!(args.m, Some(16));
            assert_eq!(args.ef_construction, Some(128));
            assert_eq!(args.ef, None);
        }
        _ => panic!("Wrong command"),
    }
}

#[test]
fn test_parse_check_with_global_flags() {
    let cli = Cli::try_parse_from([
        "regcheck",
        "check",
        "messages.jsonl",
        "--role",
        "agent",
        "--limit",
        "50",
        "-k",
        "5",
        "--concurrency",
        "8",
        "--fail-fast",
        "-o",
        "report.json",
        "--json",
        "--config",
        "custom.yaml",
    ])
    .unwrap();

    assert!(cli.json);
    assert_eq!(cli.config, Some(PathBuf::from("custom.yaml")));
    match cli.command {
        Commands::Check(args) => {
            assert_eq!(args.dataset, PathBuf::from("messages.jsonl"));
            assert_eq!(args.role.as_deref(), Some("agent"));
            assert_eq!(args.limit, Some(50));
            assert_eq!(args.k, Some(5));
            assert_eq!(args.concurrency, Some(8));
            assert!(args.fail_fast);
            assert_eq!(args.output, Some(PathBuf::from("report.json")));
        }
        _ => panic!("Wrong command"),
    }
}

#[test]
fn test_parse_search_and_judge() {
    let cli = Cli::try_parse_from(["regcheck", "search", "guaranteed returns", "-k", "3"]).unwrap();
    match cli.command {
        Commands::Search(args) => {
            assert_eq!(args.query, "guaranteed returns");
            assert_eq!(args.k, Some(3));
        }
        _ => panic!("Wrong command"),
    }

    let cli = Cli::try_parse_from(["regcheck", "-j", "judge", "I promise a 20% return"]).unwrap();
    assert!(cli.json);
    assert!(matches!(cli.command, Commands::Judge(_)));
}

#[test]
fn test_parse_status_and_teardown() {
    let cli = Cli::try_parse_from(["regcheck", "status"]).unwrap();
    assert!(matches!(cli.command, Commands::Status(_)));
    assert!(!cli.json);

    let cli = Cli::try_parse_from(["regcheck", "teardown", "--yes"]).unwrap();
    match cli.command {
        Commands::Teardown(args) => assert!(args.yes),
        _ => panic!("Wrong command"),
    }
}

#[test]
fn test_unknown_command_rejected() {
    assert!(Cli::try_parse_from(["regcheck", "submit"]).is_err());
}

#[test]
fn test_parse_embed_wait() {
    let cli = Cli::try_parse_from(["regcheck", "embed", "--wait", "60"]).unwrap();
    match cli.command {
        Commands::Embed(args) => assert_eq!(args.wait, Some(60)),
        _ => panic!("Wrong command"),
    }
}
