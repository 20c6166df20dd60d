use std::sync::Arc;

use esm_importmap::test_utils::{MockRegistry, fixture_registry};
use esm_importmap::{Error, ImportMap, ImportMapConfig, MetadataFetcher};

fn setup() -> (Arc<MockRegistry>, Arc<MetadataFetcher>) {
    let registry = Arc::new(fixture_registry());
    let fetcher = Arc::new(MetadataFetcher::new(registry.clone()).without_disk_cache());
    (registry, fetcher)
}

fn es2022() -> ImportMap {
    ImportMap::with_config(ImportMapConfig {
        target: "es2022".to_string(),
        ..ImportMapConfig::default()
    })
}

#[tokio::test]
async fn test_react_dom_with_peer_react() {
    let (_, fetcher) = setup();
    let mut im = es2022();
    let outcome = im.add_packages(&fetcher, ["react@18", "react-dom@18"]).await;
    assert!(outcome.is_ok(), "{:?}", outcome.errors);
    assert!(outcome.warnings.is_empty());
    assert_eq!(outcome.added.len(), 2);

    assert_eq!(im.imports["react"], "https://esm.sh/*react@18.3.1/es2022/react.mjs");
    assert_eq!(im.imports["react/"], "https://esm.sh/*react@18.3.1&target=es2022/");
    assert_eq!(
        im.imports["react-dom"],
        "https://esm.sh/*react-dom@18.3.1/es2022/react-dom.mjs"
    );

    let cdn = &im.scopes["https://esm.sh/"];
    assert_eq!(cdn["scheduler"], "https://esm.sh/*scheduler@0.23.2/es2022/scheduler.mjs");
    assert_eq!(
        cdn["loose-envify"],
        "https://esm.sh/*loose-envify@1.4.0/es2022/loose-envify.mjs"
    );
    assert_eq!(cdn["js-tokens"], "https://esm.sh/js-tokens@4.0.0/es2022/js-tokens.mjs");
    assert_eq!(im.scopes.len(), 1);

    let (url, ok) = im.resolve("react-dom/client", None);
    assert!(ok);
    assert_eq!(url, "https://esm.sh/*react-dom@18.3.1&target=es2022/client");
}

#[tokio::test]
async fn test_unbound_peer_goes_to_imports() {
    let (_, fetcher) = setup();
    let mut im = ImportMap::default();
    let outcome = im.add_packages(&fetcher, ["react-dom@19"]).await;
    assert!(outcome.is_ok());

    assert_eq!(im.imports["react"], "https://esm.sh/react@19.1.0/es2024/react.mjs");
    assert_eq!(im.imports["react/"], "https://esm.sh/react@19.1.0&target=es2024/");
    assert_eq!(
        im.scopes["https://esm.sh/"]["scheduler"],
        "https://esm.sh/scheduler@0.26.0/es2024/scheduler.mjs"
    );
    // the peer is not bound twice
    assert!(!im.scopes["https://esm.sh/"].contains_key("react"));
}

#[tokio::test]
async fn test_unmet_peer_is_a_warning() {
    let (_, fetcher) = setup();
    let mut im = ImportMap::default();
    let outcome = im.add_packages(&fetcher, ["react@18.2.0", "react-dom@19"]).await;

    assert!(outcome.is_ok());
    assert_eq!(
        outcome.warnings,
        ["incorrect peer dependency react@18.2.0 (unmet ^19.1.0)"]
    );
    assert_eq!(im.imports["react"], "https://esm.sh/*react@18.2.0/es2024/react.mjs");
}

#[tokio::test]
async fn test_conflicts_become_scopes() {
    let (_, fetcher) = setup();
    let mut im = ImportMap::default();
    let outcome = im.add_packages(&fetcher, ["loose-envify@1.0.0", "react@18"]).await;
    assert!(outcome.is_ok());

    let scope_keys: Vec<_> = im.sorted_scope_keys().into_inner();
    assert_eq!(
        scope_keys,
        [
            "https://esm.sh/*react@18.3.1/",
            "https://esm.sh/*loose-envify@1.4.0/",
            "https://esm.sh/",
        ]
    );
    assert_eq!(
        im.scopes["https://esm.sh/"]["js-tokens"],
        "https://esm.sh/js-tokens@1.0.3/es2024/js-tokens.mjs"
    );
    assert_eq!(
        im.scopes["https://esm.sh/*react@18.3.1/"]["loose-envify"],
        "https://esm.sh/*loose-envify@1.4.0/es2024/loose-envify.mjs"
    );
    assert_eq!(
        im.scopes["https://esm.sh/*loose-envify@1.4.0/"]["js-tokens"],
        "https://esm.sh/js-tokens@4.0.0/es2024/js-tokens.mjs"
    );

    let resolve = |specifier: &str, referrer: &str| im.resolve(specifier, Some(referrer));
    assert_eq!(
        resolve("loose-envify", "https://esm.sh/*react@18.3.1/es2024/react.mjs"),
        ("https://esm.sh/*loose-envify@1.4.0/es2024/loose-envify.mjs".to_string(), true)
    );
    assert_eq!(
        resolve("js-tokens", "https://esm.sh/*loose-envify@1.4.0/es2024/loose-envify.mjs"),
        ("https://esm.sh/js-tokens@4.0.0/es2024/js-tokens.mjs".to_string(), true)
    );
    assert_eq!(
        resolve("js-tokens", "https://esm.sh/*loose-envify@1.0.0/es2024/loose-envify.mjs"),
        ("https://esm.sh/js-tokens@1.0.3/es2024/js-tokens.mjs".to_string(), true)
    );
    assert_eq!(im.resolve("js-tokens", None), ("js-tokens".to_string(), false));
}

#[tokio::test]
async fn test_new_dependency_of_scoped_package_is_shared() {
    let registry = Arc::new(
        MockRegistry::new()
            .publish("old", "1.0.0", &[], &[])
            .publish("old", "2.0.0", &[("leaf", "^1.0.0")], &[])
            .publish("leaf", "1.0.0", &[], &[])
            .publish("app", "1.0.0", &[("old", "^2.0.0")], &[]),
    );
    let fetcher = Arc::new(MetadataFetcher::new(registry).without_disk_cache());
    let mut im = ImportMap::default();

    let outcome = im.add_packages(&fetcher, ["old@1.0.0", "app@1.0.0"]).await;
    assert!(outcome.is_ok(), "{:?}", outcome.errors);

    assert_eq!(im.imports["old"], "https://esm.sh/old@1.0.0/es2024/old.mjs");
    assert_eq!(
        im.scopes["https://esm.sh/*app@1.0.0/"]["old"],
        "https://esm.sh/*old@2.0.0/es2024/old.mjs"
    );
    // leaf is new, so it lands in the shared scope rather than a conflict scope
    assert_eq!(
        im.scopes["https://esm.sh/"]["leaf"],
        "https://esm.sh/leaf@1.0.0/es2024/leaf.mjs"
    );
    assert!(!im.scopes["https://esm.sh/*app@1.0.0/"].contains_key("leaf"));
    assert!(!im.scopes.contains_key("https://esm.sh/*old@2.0.0/"));
}

#[tokio::test]
async fn test_compatible_versions_share_one_binding() {
    let (_, fetcher) = setup();
    let mut im = ImportMap::default();
    let outcome = im.add_packages(&fetcher, ["loose-envify@1.1.0", "react@18"]).await;
    assert!(outcome.is_ok());

    assert_eq!(
        im.imports["loose-envify"],
        "https://esm.sh/*loose-envify@1.1.0/es2024/loose-envify.mjs"
    );
    assert_eq!(im.scopes.keys().collect::<Vec<_>>(), ["https://esm.sh/"]);
}

#[tokio::test]
async fn test_invalid_specifier_does_not_stop_others() {
    let (_, fetcher) = setup();
    let mut im = ImportMap::default();
    let outcome = im
        .add_packages(&fetcher, ["react@19", "My Package@abc", "", "preact"])
        .await;

    assert_eq!(outcome.errors.len(), 1);
    assert!(matches!(&outcome.errors[0], Error::InvalidSpecifier(s) if s == "My Package@abc"));
    let added: Vec<_> = outcome.added.iter().map(ToString::to_string).collect();
    assert_eq!(added, ["react@19.1.0", "preact@10.26.4"]);
}

#[tokio::test]
async fn test_registry_failures() {
    let (registry, fetcher) = setup();
    registry.fail("scheduler", 500);

    let mut im = ImportMap::default();
    let outcome = im
        .add_packages(&fetcher, ["left-pad@1.0.0", "react-dom@19"])
        .await;

    assert_eq!(outcome.errors.len(), 2, "{:?}", outcome.errors);
    assert!(matches!(
        &outcome.errors[0],
        Error::PackageNotFound { name, version } if name == "left-pad" && version == "1.0.0"
    ));
    assert!(matches!(&outcome.errors[1], Error::UnexpectedStatus { status: 500, .. }));

    // the failing branch does not take its siblings down
    assert!(im.imports.contains_key("react-dom"));
    assert!(im.imports.contains_key("react"));
    assert!(!im.scopes.contains_key("https://esm.sh/"));
}

#[tokio::test]
async fn test_resolution_is_idempotent() {
    let (registry, fetcher) = setup();
    let specifiers = ["react-dom@18", "loose-envify@1.0.0", "@preact/signals"];

    let mut first = ImportMap::default();
    first.add_packages(&fetcher, specifiers).await;
    let json = first.format_json(0);

    let fetches = registry.total_fetches();
    let outcome = first.add_packages(&fetcher, specifiers).await;
    assert!(outcome.is_ok());
    assert_eq!(first.format_json(0), json);
    assert_eq!(registry.total_fetches(), fetches);

    let mut second = ImportMap::default();
    second.add_packages(&fetcher, specifiers).await;
    assert_eq!(second.format_json(0), json);
}

#[tokio::test]
async fn test_jsr_and_github_packages() {
    let (_, fetcher) = setup();
    let mut im = ImportMap::default();
    let outcome = im
        .add_packages(&fetcher, ["jsr:@luca/flag", "esm-dev/tiny#main"])
        .await;
    assert!(outcome.is_ok(), "{:?}", outcome.errors);

    assert_eq!(
        im.imports["@luca/flag"],
        "https://esm.sh/jsr/@luca/flag@1.0.1/es2024/flag.mjs"
    );
    assert_eq!(
        im.imports["esm-dev/tiny"],
        "https://esm.sh/gh/esm-dev/tiny@main/es2024/tiny.mjs"
    );
}

#[tokio::test]
async fn test_custom_cdn() {
    let (_, fetcher) = setup();
    let mut im = ImportMap::with_config(ImportMapConfig {
        cdn: "https://cdn.example.com/".to_string(),
        ..ImportMapConfig::default()
    });
    im.add_packages(&fetcher, ["react-dom@19"]).await;

    assert_eq!(
        im.imports["react-dom"],
        "https://cdn.example.com/*react-dom@19.1.0/es2024/react-dom.mjs"
    );
    assert!(im.scopes.contains_key("https://cdn.example.com/"));
    assert!(im.format_json(0).starts_with(
        "{\n  \"config\": {\n    \"cdn\": \"https://cdn.example.com\""
    ));
}

#[tokio::test]
async fn test_user_bindings_are_respected() {
    let (registry, fetcher) = setup();
    let mut im = ImportMap::default();
    im.imports
        .insert("scheduler".to_string(), "./vendor/scheduler.js".to_string());

    let outcome = im.add_packages(&fetcher, ["react-dom@19"]).await;
    assert!(outcome.is_ok());
    assert_eq!(im.imports["scheduler"], "./vendor/scheduler.js");
    assert!(!im.scopes.contains_key("https://esm.sh/"));
    assert_eq!(registry.fetch_count_for("scheduler"), 0);
}

#[tokio::test]
async fn test_shared_preview_build_is_bound_once() {
    const TINYBENCH: &str = "https://esm.sh/pr/tinybench@a832a55/es2024/tinybench.mjs";
    let registry = Arc::new(
        MockRegistry::new()
            .publish("a", "1.0.0", &[("tinybench", "https://pkg.pr.new/tinybench@a832a55")], &[])
            .publish("b", "1.0.0", &[("tinybench", "https://pkg.pr.new/tinybench@a832a55")], &[])
            .publish_to("pr/", "tinybench", "a832a55", &[], &[]),
    );
    let fetcher = Arc::new(MetadataFetcher::new(registry.clone()).without_disk_cache());
    let mut im = ImportMap::default();

    let outcome = im.add_packages(&fetcher, ["a@1.0.0", "b@1.0.0"]).await;
    assert!(outcome.is_ok(), "{:?}", outcome.errors);
    assert!(outcome.warnings.is_empty());

    let holders: Vec<&String> = im
        .scopes
        .iter()
        .filter(|(_, bindings)| bindings.contains_key("tinybench"))
        .map(|(scope, _)| scope)
        .collect();
    assert_eq!(holders, ["https://esm.sh/"]);
    assert_eq!(im.scopes["https://esm.sh/"]["tinybench"], TINYBENCH);
    assert!(!im.imports.contains_key("tinybench"));
    assert_eq!(registry.fetch_count_for("tinybench"), 1);

    // a directly bound preview survives tidy
    let mut direct = ImportMap::default();
    direct.imports.insert("tinybench".to_string(), TINYBENCH.to_string());
    let outcome = direct.tidy(&fetcher).await;
    assert!(outcome.is_ok(), "{:?}", outcome.errors);
    assert_eq!(outcome.added.len(), 1);
    assert_eq!(direct.imports["tinybench"], TINYBENCH);
    assert!(direct.imports.contains_key("tinybench/"));
}

#[tokio::test]
async fn test_tidy_regenerates_cdn_scopes() {
    let (_, fetcher) = setup();
    let mut im = ImportMap::parse(
        r#"{
  "imports": {
    "app": "./app.js",
    "react": "https://esm.sh/*react@18.2.0/es2024/react.mjs",
    "react/": "https://esm.sh/*react@18.2.0&target=es2024/"
  },
  "scopes": {
    "https://esm.sh/*gone@1.0.0/": {
      "js-tokens": "https://esm.sh/js-tokens@1.0.3/es2024/js-tokens.mjs"
    },
    "./legacy/": {
      "lodash": "./legacy/lodash.js"
    }
  }
}"#,
    )
    .unwrap();

    let outcome = im.tidy(&fetcher).await;
    assert!(outcome.is_ok(), "{:?}", outcome.errors);

    assert_eq!(im.imports["app"], "./app.js");
    assert_eq!(im.imports["react"], "https://esm.sh/*react@18.2.0/es2024/react.mjs");
    assert!(im.scopes.contains_key("./legacy/"));
    assert!(!im.scopes.contains_key("https://esm.sh/*gone@1.0.0/"));
    assert_eq!(
        im.scopes["https://esm.sh/"]["loose-envify"],
        "https://esm.sh/*loose-envify@1.4.0/es2024/loose-envify.mjs"
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_resolutions_share_fetches() {
    let (registry, fetcher) = setup();

    let mut tasks = tokio::task::JoinSet::new();
    for _ in 0..16 {
        let fetcher = Arc::clone(&fetcher);
        tasks.spawn(async move {
            let mut im = ImportMap::default();
            let outcome = im
                .add_packages(&fetcher, ["react-dom@18", "loose-envify@1.0.0"])
                .await;
            assert!(outcome.is_ok());
            im.format_json(0)
        });
    }

    let mut outputs = Vec::new();
    while let Some(output) = tasks.join_next().await {
        outputs.push(output.unwrap());
    }
    assert!(outputs.windows(2).all(|pair| pair[0] == pair[1]));
    assert_eq!(
        registry.fetch_count("https://esm.sh/react-dom@18/package.json"),
        1
    );
    assert_eq!(
        registry.fetch_count("https://esm.sh/js-tokens@^1.0.0/package.json"),
        1
    );
}
