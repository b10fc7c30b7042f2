use elemcraft_core::db::open_db_in_memory;
use elemcraft_core::{
    canonicalize, CanonicalPair, CombinationPrompt, CombinationResolver, ElementGenerator,
    GenerationError, GenerationUnavailable, InsertOutcome, InvalidLabel, PairRecord,
    PairRepository, ParseError, RepoResult, ResolutionSource, ResolveError, ResolverSettings,
    SqlitePairRepository,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::ThreadId;
use std::time::Duration;

/// Answers by prompt text; unknown prompts fail as unavailable.
#[derive(Default)]
struct ScriptedGenerator {
    replies: HashMap<String, String>,
    calls: AtomicUsize,
}

impl ScriptedGenerator {
    fn reply(mut self, word1: &str, word2: &str, raw: &str) -> Self {
        let prompt = CombinationPrompt::for_pair(&canonicalize(word1, word2));
        self.replies.insert(prompt.user, raw.to_string());
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ElementGenerator for ScriptedGenerator {
    async fn generate(&self, prompt: &CombinationPrompt) -> Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.replies
            .get(&prompt.user)
            .cloned()
            .ok_or_else(|| GenerationError::Unavailable("no scripted reply".to_string()))
    }
}

/// Never answers within any sane timeout.
struct StalledGenerator;

impl ElementGenerator for StalledGenerator {
    async fn generate(&self, _prompt: &CombinationPrompt) -> Result<String, GenerationError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok("💨,steam".to_string())
    }
}

/// Yields once, then answers differently on every call.
#[derive(Default)]
struct RacingGenerator {
    calls: AtomicUsize,
}

impl ElementGenerator for RacingGenerator {
    async fn generate(&self, _prompt: &CombinationPrompt) -> Result<String, GenerationError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        Ok(if call == 0 { "💨,steam" } else { "☁️,cloud" }.to_string())
    }
}

fn store() -> Arc<SqlitePairRepository> {
    Arc::new(SqlitePairRepository::try_new(open_db_in_memory().unwrap()).unwrap())
}

fn resolver<G: ElementGenerator>(
    repo: &Arc<SqlitePairRepository>,
    generator: G,
) -> CombinationResolver<Arc<SqlitePairRepository>, G> {
    CombinationResolver::new(Arc::clone(repo), generator, ResolverSettings::default())
}

#[tokio::test]
async fn new_pair_is_generated_then_served_from_store() {
    let repo = store();
    let generator = ScriptedGenerator::default().reply("fire", "water", "💨,steam");
    let resolver = resolver(&repo, generator);

    let first = resolver.resolve("water", "fire").await.unwrap();
    assert_eq!(first.source, ResolutionSource::Generated);
    assert_eq!(first.element.emoji, "💨");
    assert_eq!(first.element.text, "steam");
    assert!(first.element.discovered);
    assert_eq!((first.pair.word1(), first.pair.word2()), ("fire", "water"));

    let stored = repo
        .find_by_pair(&canonicalize("fire", "water"))
        .unwrap()
        .unwrap();
    assert_eq!((stored.emoji.as_str(), stored.text.as_str()), ("💨", "steam"));

    let second = resolver.resolve("fire", "water").await.unwrap();
    assert_eq!(second.source, ResolutionSource::Cached);
    assert_eq!(second.element.text, "steam");
    assert!(!second.element.discovered);

    assert_eq!(resolver.generator().calls(), 1);
    assert_eq!(repo.count().unwrap(), 1);
}

#[tokio::test]
async fn input_order_and_case_do_not_matter() {
    let repo = store();
    let generator = ScriptedGenerator::default().reply("earth", "fire", "🌋,Lava");
    let resolver = resolver(&repo, generator);

    let a = resolver.resolve("Fire", "EARTH").await.unwrap();
    let b = resolver.resolve("earth", "fire").await.unwrap();

    assert_eq!(a.element.text, "lava");
    assert_eq!(a.element.emoji, b.element.emoji);
    assert_eq!(a.element.text, b.element.text);
    assert_eq!(resolver.generator().calls(), 1);
}

#[tokio::test]
async fn malformed_output_writes_nothing() {
    let repo = store();
    let resolver = resolver(
        &repo,
        ScriptedGenerator::default().reply("fire", "water", "I think it would be steam"),
    );

    let err = resolver.resolve("fire", "water").await.unwrap_err();
    assert!(matches!(
        err,
        ResolveError::MalformedGeneration(ParseError::MissingSeparator(_))
    ));
    assert_eq!(repo.count().unwrap(), 0);

    let retry = resolver_with_reply(&repo, "💨,steam");
    let resolution = retry.resolve("fire", "water").await.unwrap();
    assert_eq!(resolution.source, ResolutionSource::Generated);
    assert_eq!(repo.count().unwrap(), 1);
}

fn resolver_with_reply(
    repo: &Arc<SqlitePairRepository>,
    raw: &str,
) -> CombinationResolver<Arc<SqlitePairRepository>, ScriptedGenerator> {
    resolver(repo, ScriptedGenerator::default().reply("fire", "water", raw))
}

#[tokio::test]
async fn empty_generator_response_is_malformed() {
    let repo = store();
    let generator = ScriptedGenerator::default().reply("fire", "water", "  \n ");
    let resolver = resolver(&repo, generator);

    let err = resolver.resolve("fire", "water").await.unwrap_err();
    assert!(matches!(
        err,
        ResolveError::MalformedGeneration(ParseError::EmptyResponse)
    ));
    assert_eq!(err.code(), "malformed_generation");
}

#[tokio::test]
async fn known_result_text_reuses_stored_emoji() {
    let repo = store();
    repo.insert(&PairRecord::new(canonicalize("fire", "water"), "💨", "steam").unwrap())
        .unwrap();
    let generator = ScriptedGenerator::default().reply("ice", "fire", "♨️,Steam");
    let resolver = resolver(&repo, generator);

    let resolution = resolver.resolve("ice", "fire").await.unwrap();
    assert_eq!(resolution.source, ResolutionSource::Generated);
    assert_eq!(resolution.element.emoji, "💨");
    assert_eq!(resolution.element.text, "steam");

    let stored = repo
        .find_by_pair(&canonicalize("fire", "ice"))
        .unwrap()
        .unwrap();
    assert_eq!(stored.emoji, "💨");
    assert_eq!(repo.count().unwrap(), 2);
}

#[tokio::test]
async fn generator_failure_is_reported_as_unavailable() {
    let repo = store();
    let resolver = resolver(&repo, ScriptedGenerator::default());

    let err = resolver.resolve("fire", "water").await.unwrap_err();
    assert!(matches!(
        err,
        ResolveError::GenerationUnavailable(GenerationUnavailable::Failed(
            GenerationError::Unavailable(_)
        ))
    ));
    assert_eq!(repo.count().unwrap(), 0);
}

#[tokio::test(start_paused = true)]
async fn slow_generator_times_out() {
    let repo = store();
    let settings = ResolverSettings {
        generation_timeout: Duration::from_millis(200),
        ..ResolverSettings::default()
    };
    let resolver = CombinationResolver::new(Arc::clone(&repo), StalledGenerator, settings);

    let err = resolver.resolve("fire", "water").await.unwrap_err();
    match err {
        ResolveError::GenerationUnavailable(GenerationUnavailable::TimedOut(limit)) => {
            assert_eq!(limit, Duration::from_millis(200));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(repo.count().unwrap(), 0);
}

#[tokio::test]
async fn blank_labels_are_rejected_before_generation() {
    let repo = store();
    let resolver = resolver(&repo, ScriptedGenerator::default());

    let err = resolver.resolve("  ", "water").await.unwrap_err();
    assert!(matches!(
        err,
        ResolveError::InvalidInput(InvalidLabel::First)
    ));
    let err = resolver.resolve("", "").await.unwrap_err();
    assert!(matches!(err, ResolveError::InvalidInput(InvalidLabel::Both)));
    assert_eq!(resolver.generator().calls(), 0);
}

#[tokio::test]
async fn overlong_label_is_rejected() {
    let repo = store();
    let settings = ResolverSettings {
        max_label_chars: 8,
        ..ResolverSettings::default()
    };
    let generator =
        ScriptedGenerator::default().reply("fire", "water", "💨,a very hot cloud of steam");
    let resolver = CombinationResolver::new(Arc::clone(&repo), generator, settings);

    let err = resolver.resolve("fire", "water").await.unwrap_err();
    assert!(matches!(
        err,
        ResolveError::MalformedGeneration(ParseError::TextTooLong { max_chars: 8, .. })
    ));
    assert_eq!(repo.count().unwrap(), 0);
}

#[tokio::test]
async fn racing_resolutions_converge_on_one_record() {
    let repo = store();
    let resolver = resolver(&repo, RacingGenerator::default());

    let (a, b) = tokio::join!(
        resolver.resolve("fire", "water"),
        resolver.resolve("water", "fire")
    );
    let (a, b) = (a.unwrap(), b.unwrap());

    // Exactly one call stores; the other sees its record, cached or on insert.
    let generated = [a.source, b.source]
        .iter()
        .filter(|source| **source == ResolutionSource::Generated)
        .count();
    assert_eq!(generated, 1);
    assert_eq!(a.element.text, b.element.text);
    assert_eq!(a.element.emoji, b.element.emoji);

    let stored = repo
        .find_by_pair(&canonicalize("fire", "water"))
        .unwrap()
        .unwrap();
    assert_eq!(stored.text, a.element.text);
    assert_eq!(repo.count().unwrap(), 1);
}

/// Pair store that remembers which threads served it.
struct ThreadRecordingStore {
    inner: SqlitePairRepository,
    threads: Mutex<Vec<ThreadId>>,
}

impl ThreadRecordingStore {
    fn record(&self) {
        self.threads.lock().unwrap().push(std::thread::current().id());
    }
}

impl PairRepository for ThreadRecordingStore {
    fn find_by_pair(&self, pair: &CanonicalPair) -> RepoResult<Option<PairRecord>> {
        self.record();
        self.inner.find_by_pair(pair)
    }

    fn find_by_text(&self, text: &str) -> RepoResult<Option<PairRecord>> {
        self.record();
        self.inner.find_by_text(text)
    }

    fn insert(&self, record: &PairRecord) -> RepoResult<InsertOutcome> {
        self.record();
        self.inner.insert(record)
    }

    fn count(&self) -> RepoResult<u64> {
        self.inner.count()
    }
}

#[tokio::test]
async fn store_calls_run_off_the_runtime_thread() {
    let store = Arc::new(ThreadRecordingStore {
        inner: SqlitePairRepository::try_new(open_db_in_memory().unwrap()).unwrap(),
        threads: Mutex::new(Vec::new()),
    });
    let generator = ScriptedGenerator::default().reply("fire", "water", "💨,steam");
    let resolver =
        CombinationResolver::new(Arc::clone(&store), generator, ResolverSettings::default());

    resolver.resolve("fire", "water").await.unwrap();

    let runtime_thread = std::thread::current().id();
    let threads = store.threads.lock().unwrap();
    // find_by_pair, find_by_text, insert
    assert_eq!(threads.len(), 3);
    assert!(threads.iter().all(|thread| *thread != runtime_thread));
}
