use serde::{Deserialize, Serialize};
use teloxide::dispatching::dialogue::{Dialogue, InMemStorage};

/// The menu a chat is currently viewing
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Menu {
    /// Main menu; free text is answered by the RAG service
    #[default]
    Main,
    /// Browsing the FAQ question list
    FaqList,
    /// Reading one FAQ answer
    FaqDetail {
        /// Id of the entry being read
        faq_id: String,
    },
    /// Reading the upcoming events
    Events,
    /// Prompted to type a question about a topic
    FreeText,
}

/// Something the user did that may move the chat to another menu
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MenuEvent {
    /// `/start`
    Start,
    /// "FAQ" button or `/faqs`
    OpenFaqs,
    /// A question picked from the FAQ list
    OpenFaq(String),
    /// "Events" button or `/events`
    OpenEvents,
    /// "Back" button
    Back,
    /// "Knowledge Portal" or "Solana Summit Event" button
    AskTopic,
    /// Free text sent as a question
    Question,
    /// Anything that only shows information (help, assistants, website link)
    Info,
}

impl Menu {
    /// The menu after `event`.
    #[must_use]
    pub fn next(&self, event: &MenuEvent) -> Self {
        match event {
            MenuEvent::Start | MenuEvent::Back | MenuEvent::Info => Self::Main,
            MenuEvent::OpenFaqs => Self::FaqList,
            MenuEvent::OpenFaq(faq_id) => Self::FaqDetail {
                faq_id: faq_id.clone(),
            },
            MenuEvent::OpenEvents => Self::Events,
            MenuEvent::AskTopic => Self::FreeText,
            MenuEvent::Question => match self {
                Self::FreeText => Self::FreeText,
                _ => Self::Main,
            },
        }
    }
}

/// Dialogue storage shared by the dispatcher
pub type MenuStorage = InMemStorage<Menu>;

/// Per-chat handle to the menu state
pub type MenuDialogue = Dialogue<Menu, MenuStorage>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_faq_navigation() {
        let list = Menu::Main.next(&MenuEvent::OpenFaqs);
        assert_eq!(list, Menu::FaqList);

        let detail = list.next(&MenuEvent::OpenFaq("7".into()));
        assert_eq!(
            detail,
            Menu::FaqDetail {
                faq_id: "7".into()
            }
        );

        assert_eq!(detail.next(&MenuEvent::Back), Menu::Main);
        assert_eq!(Menu::FaqList.next(&MenuEvent::Back), Menu::Main);
    }

    #[test]
    fn test_start_resets_every_state() {
        let states = [
            Menu::Main,
            Menu::FaqList,
            Menu::FaqDetail {
                faq_id: "1".into(),
            },
            Menu::Events,
            Menu::FreeText,
        ];
        for state in states {
            assert_eq!(state.next(&MenuEvent::Start), Menu::Main);
        }
    }

    #[test]
    fn test_questions_keep_topic_prompt() {
        assert_eq!(Menu::Main.next(&MenuEvent::Question), Menu::Main);
        assert_eq!(Menu::FreeText.next(&MenuEvent::Question), Menu::FreeText);
        assert_eq!(Menu::Events.next(&MenuEvent::Question), Menu::Main);
        assert_eq!(Menu::Main.next(&MenuEvent::AskTopic), Menu::FreeText);
    }

    #[test]
    fn test_default_is_main() {
        assert_eq!(Menu::default(), Menu::Main);
        assert_eq!(Menu::Events.next(&MenuEvent::Back), Menu::Main);
    }
}
