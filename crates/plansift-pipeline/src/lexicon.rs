//! Lexical cue patterns shared by the extractors, the classifier and the
//! synthesis filters.
//!
//! All patterns are case-insensitive and compiled once per process.

use plansift_model::markers::date_marker;
use plansift_model::static_regex;
use regex::Regex;

// -----------------------------------------------------------------------------
// Schedule
// -----------------------------------------------------------------------------

static_regex!(pub fn shift_verb = r"(?i)\b(?:push(?:es|ed|ing)?(?:\s+(?:back|out))?|delay(?:s|ed|ing)?|mov(?:e|es|ed|ing)\s+(?:out|back|up|to|from|into)|slip(?:s|ped|ping|page)?|slid|pull(?:s|ed|ing)?\s+(?:in|forward|ahead)|postpon(?:e|es|ed|ing)|reschedul(?:e|es|ed|ing)|bump(?:s|ed|ing)?|shift(?:s|ed|ing)?|extend(?:s|ed|ing)?|accelerat(?:e|es|ed|ing)|brought\s+forward)\b");

static_regex!(pub fn time_token = r"(?i)\b(?:q[1-4]|h[12]|launch(?:es|ed|ing)?|releases?|released|milestones?|deadlines?|go-live|ga|beta|v\d+(?:\.\d+)*|version\s+\d+(?:\.\d+)*|sprints?|eta|next\s+(?:week|month|quarter|sprint|year)|end\s+of\s+(?:the\s+)?(?:week|month|quarter|year)|\d+[-\s]?(?:day|week|month|sprint|quarter)s?|(?:jan(?:uary)?|feb(?:ruary)?|march|april|june|july|august|september|october|november|december)|may\s+\d{1,2}|(?:mon|tues|wednes|thurs|fri)day)\b");

static_regex!(pub fn explicit_duration = r"(?i)\b\d+[-\s]?(?:day|week|month|sprint|quarter)s?\b|\b(?:a|one|two|three|four|five|six|few|couple\s+of)\s+(?:more\s+)?(?:days|weeks|months|sprints|quarters)\b");

static_regex!(pub fn descope = r"(?i)\b(?:descop\w*|de-scop\w*|cut\s+(?:the\s+)?scope|reduce\s+scope|scope\s+(?:cut|down|reduction)|reprioriti[sz]\w*|deprioriti[sz]\w*|drop(?:ped)?\s+from\s+(?:the\s+)?(?:release|launch|roadmap))\b");

static_regex!(pub fn pull_in = r"(?i)\b(?:pull(?:s|ed|ing)?\s+(?:in|forward|ahead)|accelerat(?:e|es|ed|ing)|brought\s+forward|mov(?:e|es|ed|ing)\s+up|ahead\s+of\s+schedule)\b");

static_regex!(pub fn timeline_word = r"(?i)\b(?:timelines?|roadmap|schedule[ds]?|plan\s+of\s+record|target\s+date|due\s+date)\b");

static_regex!(pub fn status_cue = r"(?i)\b(?:status|on\s+track|off\s+track|shipped|launched|done|completed?|finished|in\s+progress|wip|merged|deployed|blocked|behind|ahead|currently|this\s+week|last\s+week|progress)\b");

static_regex!(fn may_date = r"(?i)\bmay\s+\d{1,2}(?:st|nd|rd|th)?\b");

// -----------------------------------------------------------------------------
// Hedging
// -----------------------------------------------------------------------------

static_regex!(fn conditional_word = r"(?i)\b(?:if|unless|might|could|may|maybe|possibly|perhaps|potentially|whether)\b");

static_regex!(fn speculative_word = r"(?i)\b(?:would|in\s+case|what\s+if|worried|worry|suspect|hypothetical(?:ly)?|risk\s+of|chance\s+of)\b");

static_regex!(pub fn strong_conditional = r"(?i)\b(?:if|unless)\s+(?:we|they|it|you|the\s+\w+)\s+(?:can't|cannot|can\s+not|don't|do\s+not|won't|will\s+not|fail\s+to|aren't|isn't|doesn't|does\s+not)\b|\bmight\s+need\s+to\s+be\b|\bunless\s+we\b|\bif\s+(?:\w+\s+){0,3}(?:slips?|fails?|falls?\s+through)\b");

static_regex!(pub fn consequence = r"(?i)\b(?:releases?|launch(?:es)?|compliance|partnerships?|dead\s+in\s+the\s+water|data\s+residency|contracts?|deals?|go-live|certifications?|audits?|renewals?)\b");

static_regex!(pub fn subjective_prefix = r"(?i)^\W*(?:there(?:'s|\s+is|\s+was)\s+)?(?:some\s+|a\s+|general\s+)?(?:concerns?|worr(?:y|ies)|risks?|feelings?|sense)\s+that\b");

/// True when `text` contains a conditional token. "May 3" style dates do not count.
pub fn has_conditional(text: &str) -> bool {
    let cleaned = may_date().replace_all(text, " ");
    conditional_word().is_match(&cleaned)
}

/// Conditional or otherwise speculative language.
pub fn has_speculation(text: &str) -> bool {
    has_conditional(text) || speculative_word().is_match(text)
}

pub fn has_time_token(text: &str) -> bool {
    time_token().is_match(text) || date_marker().is_match(text)
}

/// A shift verb together with an explicit time unit: a schedule slip statement.
pub fn is_schedule_slip(text: &str) -> bool {
    shift_verb().is_match(text) && (explicit_duration().is_match(text) || has_time_token(text))
}

// -----------------------------------------------------------------------------
// Demand, failure, risk
// -----------------------------------------------------------------------------

static_regex!(pub fn external_actor = r"(?i)\b(?:users?|customers?|clients?|they|buyers?|admins?|partners?|prospects?|stakeholders?|sales|support|finance|legal|cto|ceo|cfo|vp|leadership|enterprise|merchants?|tenants?|operators?)\b");

static_regex!(pub fn desire = r"(?i)\b(?:need(?:s|ed)?|want(?:s|ed)?|request(?:s|ed|ing)?|asking\s+for|asked\s+for|asks\s+for|would\s+like|looking\s+for|require[sd]?|wish(?:es)?|expect(?:s|ed)?|demand(?:s|ed|ing)?|keep\s+asking)\b");

static_regex!(pub fn desire_object = r"(?i)\b(?:need(?:s|ed)?|want(?:s|ed)?|requesting|requested|requests|asking\s+for|asked\s+for|asks\s+for|would\s+like|looking\s+for|require[sd]?|demand(?:s|ed|ing)?|keep\s+asking\s+for)\s+(?P<object>[^.;!?]{3,160})");

static_regex!(pub fn desire_negation = r"(?i)\b(?:don't|do\s+not|doesn't|does\s+not|didn't|did\s+not|no\s+longer|never|won't)\s+(?:really\s+)?(?:need|want|require|ask|request)");

static_regex!(pub fn demand_amplifier = r"(?i)\b(?:blockers?|blocking|blocked|failing|expansion|churn(?:ing)?|renewals?|deals?|upsell|escalat\w*)\b");

static_regex!(pub fn failure = r"(?i)\b(?:fail(?:s|ed|ing|ures?)?|broken|breaks|breaking|latency|errors?|regression|regress(?:ed|es)|crash(?:es|ed|ing)?|bugs?|buggy|outages?|timeouts?|timing\s+out|5\d\d\s+errors?|exceptions?|flaky|doesn't\s+work|does\s+not\s+work|not\s+working|stopped\s+working)\b");

static_regex!(pub fn risk_vocab = r"(?i)\b(?:risks?|risky|concerns?|pii|gdpr|hipaa|soc\s?2|compliance|security|vulnerab\w*|exposure|exposed|blockers?|leak(?:s|ed|ing)?|breach(?:es)?|liability)\b");

static_regex!(pub fn pii = r"(?i)\bpii\b|\bpersonal(?:ly)?\s+(?:identifiable\s+)?(?:data|information)\b");

static_regex!(pub fn logging_or_user_ids = r"(?i)\b(?:logging|logs?|logged|user\s*ids?)\b");

static_regex!(pub fn severe_outcome = r"(?i)\b(?:outage|data\s+loss|all\s+users|every\s+customer|p0|sev\s?[01]|security\s+incident|dead\s+in\s+the\s+water|breach|fines?|lawsuit)\b");

static_regex!(pub fn minor_outcome = r"(?i)\b(?:minor|cosmetic|typo|small|edge\s+case|low\s+impact|nit)\b");

// -----------------------------------------------------------------------------
// Work and noise
// -----------------------------------------------------------------------------

static_regex!(pub fn execution_verb = r"(?i)\b(?:build|implement|ship|launch|add|create|migrate|integrate|deploy|roll\s*out|rollout|develop|design|prototype|automate|refactor|replace|introduce|spin\s+up|stand\s+up|fix|remediate|harden|instrument|rewrite|support)\b");

static_regex!(pub fn obligation = r"(?i)\b(?:need\s+to|needs\s+to|should|must|have\s+to|has\s+to|let's|going\s+to|plan\s+to|will)\b");

static_regex!(pub fn process_owner = r"(?i)\b(?:who\s+owns|owner(?:ship)?\s+(?:of|for)|unclear\s+who|not\s+clear\s+who|(?:sign-?off|approval|review)\s+(?:process|step|owner|flow)|raci|who(?:'s|\s+is)\s+(?:responsible|accountable|driving|on\s+point)|decide\s+who|needs?\s+an?\s+owner|no\s+owner)\b");

static_regex!(pub fn delivery_assignment = r"(?i)\bowner\s*:\s*\S+|\b(?:engineering|eng|design|product|platform|backend|frontend|infra|data|qa|ops)\s+(?:team\s+)?(?:to|will)\s+(?:implement|build|ship|deliver|fix|add|own)\b|\bassigned\s+to\s+\S+");

static_regex!(pub fn spec_vocab = r"(?i)\b(?:scor(?:e|es|ing)|eligib(?:le|ility)|weight(?:s|ing|ed)?|criteria|rubric|formula|thresholds?|tier(?:s|ing)?|coefficients?|calculat(?:ion|ed)|points?\s+per)\b");

static_regex!(pub fn explicit_ask = r"(?i)\b(?:asks?\s+for|asked\s+for|asking\s+for|would\s+(?:like|love)(?:\s+to\s+(?:have|see|get))?|(?:we|they|users?|customers?|clients?|teams?)\s+needs?|requests?(?:ed)?|wants?)\s+(?:to\s+(?:have|get|see)\s+)?(?P<object>[^.;!?]{3,160})");

// -----------------------------------------------------------------------------
// Headings
// -----------------------------------------------------------------------------

static_regex!(pub fn next_steps_heading = r"(?i)\b(?:next\s+steps?|action\s+items?|to-?dos?|follow[-\s]?ups?|takeaways|owners?\s*(?:&|and)\s*dates?)\b");

static_regex!(pub fn strategy_heading = r"(?i)\b(?:strategy|strategic|vision|principles?|north\s+star|mission|themes?|positioning|philosophy|okrs?|goals?)\b");

static_regex!(pub fn discussion_heading = r"(?i)\b(?:discussion|details|background|context|notes?|recap|summary|retro(?:spective)?|minutes|open\s+questions|q\s*&\s*a|faq)\b");

/// Compiled patterns, for startup checks and tests.
pub fn all_patterns() -> Vec<&'static Regex> {
    vec![
        shift_verb(),
        time_token(),
        explicit_duration(),
        descope(),
        pull_in(),
        timeline_word(),
        status_cue(),
        may_date(),
        conditional_word(),
        speculative_word(),
        strong_conditional(),
        consequence(),
        subjective_prefix(),
        external_actor(),
        desire(),
        desire_object(),
        desire_negation(),
        demand_amplifier(),
        failure(),
        risk_vocab(),
        pii(),
        logging_or_user_ids(),
        severe_outcome(),
        minor_outcome(),
        execution_verb(),
        obligation(),
        process_owner(),
        delivery_assignment(),
        spec_vocab(),
        explicit_ask(),
        next_steps_heading(),
        strategy_heading(),
        discussion_heading(),
    ]
}
