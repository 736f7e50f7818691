//! Fixed, localized strings spoken by the application itself.

use crate::defaults::primary_subtag;
use crate::dialogue::mode::SetupStep;

/// Language-specific catalog of system-authored text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Phrases {
    pub greeting: &'static str,
    pub setup_topic: &'static str,
    pub setup_objective: &'static str,
    pub setup_persona: &'static str,
    pub setup_feared_objection: &'static str,
    pub setup_done: &'static str,
    pub termination_phrases: &'static [&'static str],
    pub debrief_started: &'static str,
    pub module_unavailable: &'static str,
    pub generic_error: &'static str,
}

pub const FRENCH: Phrases = Phrases {
    greeting: "Bonjour ! Je suis Echo, votre sparring-partner IA. Comment puis-je vous aider aujourd'hui ?\n\n\
        Vous pouvez me demander de :\n\
        - **Faire un jeu de rôle** (ex: \"Je veux m'entraîner pour un appel à froid\")\n\
        - **Analyser une conversation** (ex: \"Je veux débriefer un rendez-vous\")\n\
        - **Tenir un journal** (ex: \"Ouvrir mon carnet de bord\")\n\
        - **Vous préparer mentalement** (ex: \"J'ai un appel important dans 5 minutes\")",
    setup_topic: "Excellent. Quel est le contexte ? (ex: Appel à froid, Négociation de prix, Gestion d'un client mécontent...)",
    setup_objective: "Compris. Quel est votre objectif principal pour cet échange ?",
    setup_persona: "Noté. Maintenant, décrivez le profil de votre interlocuteur. Est-il pressé, analytique, amical, agressif ?",
    setup_feared_objection: "Parfait. Y a-t-il une objection particulière que vous redoutez ? (ex: C'est trop cher, Je dois en parler à mon boss...)",
    setup_done: "Très bien, nous sommes prêts. La simulation va commencer. Je jouerai le rôle que vous avez décrit. Vous pouvez commencer à parler.",
    termination_phrases: &["fin de la simulation", "arrêter la simulation"],
    debrief_started: "Simulation terminée. Passons au débriefing.",
    module_unavailable: "Ce module n'est pas encore entièrement implémenté. Essayez de commencer une simulation.",
    generic_error: "Une erreur est survenue. Veuillez réessayer.",
};

pub const ENGLISH: Phrases = Phrases {
    greeting: "Hello! I'm Echo, your AI sparring partner. How can I help you today?\n\n\
        You can ask me to:\n\
        - **Role-play** (e.g. \"I want to train for a cold call\")\n\
        - **Analyze a conversation** (e.g. \"I want to debrief a meeting\")\n\
        - **Keep a journal** (e.g. \"Open my logbook\")\n\
        - **Prepare mentally** (e.g. \"I have an important call in 5 minutes\")",
    setup_topic: "Excellent. What's the context? (e.g. Cold call, Price negotiation, Handling an unhappy customer...)",
    setup_objective: "Got it. What is your main objective for this exchange?",
    setup_persona: "Noted. Now describe the person you'll be talking to. Are they rushed, analytical, friendly, aggressive?",
    setup_feared_objection: "Perfect. Is there a particular objection you dread? (e.g. It's too expensive, I need to ask my boss...)",
    setup_done: "Great, we're ready. The simulation is starting. I'll play the role you described. You can start talking.",
    termination_phrases: &["end the simulation", "stop the simulation"],
    debrief_started: "Simulation over. Let's debrief.",
    module_unavailable: "This module is not fully available yet. Try starting a simulation.",
    generic_error: "Something went wrong. Please try again.",
};

impl Phrases {
    /// Catalog for a BCP-47 language tag. French for `fr*`, English otherwise.
    pub fn for_language(language: &str) -> &'static Phrases {
        match primary_subtag(language).as_str() {
            "fr" => &FRENCH,
            _ => &ENGLISH,
        }
    }

    /// Question asked when the setup machine arrives at `step`.
    pub fn setup_question(&self, step: SetupStep) -> &'static str {
        match step {
            SetupStep::Topic => self.setup_topic,
            SetupStep::Objective => self.setup_objective,
            SetupStep::Persona => self.setup_persona,
            SetupStep::FearedObjection => self.setup_feared_objection,
            SetupStep::Done => self.setup_done,
        }
    }
}

/// Case-insensitive substring matcher for "end the simulation" phrases.
#[derive(Debug, Clone, Default)]
pub struct TerminationMatcher {
    phrases: Vec<String>,
}

impl TerminationMatcher {
    pub fn new<I, S>(phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            phrases: phrases
                .into_iter()
                .map(|p| p.as_ref().trim().to_lowercase())
                .filter(|p| !p.is_empty())
                .fold(Vec::new(), |mut acc, p| {
                    if !acc.contains(&p) {
                        acc.push(p);
                    }
                    acc
                }),
        }
    }

    /// Catalog phrases, the English ones (understood in every language), and
    /// any user-configured extras.
    pub fn for_catalog(phrases: &Phrases, extra: &[String]) -> Self {
        Self::new(
            phrases
                .termination_phrases
                .iter()
                .chain(ENGLISH.termination_phrases)
                .copied()
                .chain(extra.iter().map(String::as_str)),
        )
    }

    pub fn matches(&self, text: &str) -> bool {
        let lowered = text.to_lowercase();
        self.phrases.iter().any(|p| lowered.contains(p.as_str()))
    }
}
