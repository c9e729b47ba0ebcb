//! Interactive prompts and the role-selection menu.
//!
//! The menu walks the sorted role list and emits an account header every
//! time the account id changes, so roles of the same account group together
//! without reordering. Selection is a single prompt: bad input aborts the
//! run rather than looping.

use std::io::{self, BufRead, Write};

use anyhow::Result;

use crate::error::AuthError;
use crate::saml::RolePair;

/// Console interaction, kept behind a trait so selection logic is testable
/// without a terminal.
pub trait Ui {
    fn read_line(&self, prompt: &str) -> io::Result<String>;
    fn read_password(&self, prompt: &str) -> io::Result<String>;
    fn show(&self, text: &str);
}

pub struct StdUi;

impl Ui for StdUi {
    fn read_line(&self, prompt: &str) -> io::Result<String> {
        print!("{prompt}: ");
        io::stdout().flush()?;
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        Ok(line.trim().to_string())
    }

    fn read_password(&self, prompt: &str) -> io::Result<String> {
        print!("{prompt}: ");
        io::stdout().flush()?;
        Ok(rpassword::read_password()?.trim().to_string())
    }

    fn show(&self, text: &str) {
        println!("{text}");
    }
}

/// Renders the grouped menu for an already-sorted role list.
pub fn render_role_menu(pairs: &[RolePair]) -> String {
    let mut menu = String::new();
    let mut previous_account = None;
    for (index, pair) in pairs.iter().enumerate() {
        let account = pair.account_id();
        if previous_account != Some(account) {
            menu.push_str(&format!("Account: {account}\n"));
            previous_account = Some(account);
        }
        menu.push_str(&format!("  {}) {}\n", index + 1, pair.role_name()));
    }
    menu
}

/// Parses a 1-based menu choice into a 0-based index. Non-numeric input and
/// anything outside `[1, max]` is `InvalidSelection`.
pub fn parse_selection(input: &str, max: usize) -> Result<usize, AuthError> {
    let invalid = || AuthError::InvalidSelection { input: input.trim().to_string(), max };
    let choice: usize = input.trim().parse().map_err(|_| invalid())?;
    if choice == 0 || choice > max {
        return Err(invalid());
    }
    Ok(choice - 1)
}

/// Resolves the role to assume. A single option is taken without prompting;
/// multiple options go through the grouped menu exactly once.
pub fn select_role<'a>(pairs: &'a [RolePair], ui: &dyn Ui) -> Result<&'a RolePair> {
    match pairs {
        [] => Err(AuthError::NoRolesFound.into()),
        [only] => Ok(only),
        _ => {
            ui.show(&render_role_menu(pairs));
            let input = ui.read_line(&format!("Select a role [1-{}]", pairs.len()))?;
            let index = parse_selection(&input, pairs.len())?;
            Ok(&pairs[index])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ScriptedUi {
        reply: Option<&'static str>,
    }

    impl Ui for ScriptedUi {
        fn read_line(&self, _prompt: &str) -> io::Result<String> {
            match self.reply {
                Some(reply) => Ok(reply.to_string()),
                None => panic!("prompt must not be invoked"),
            }
        }

        fn read_password(&self, _prompt: &str) -> io::Result<String> {
            Ok(String::new())
        }

        fn show(&self, _text: &str) {}
    }

    fn pairs() -> Vec<RolePair> {
        vec![
            RolePair::new(
                "arn:aws:iam::000000000001:saml-provider/P".into(),
                "arn:aws:iam::000000000001:role/Role-02".into(),
            ),
            RolePair::new(
                "arn:aws:iam::111111111111:saml-provider/P".into(),
                "arn:aws:iam::111111111111:role/Admin".into(),
            ),
            RolePair::new(
                "arn:aws:iam::111111111111:saml-provider/P".into(),
                "arn:aws:iam::111111111111:role/ReadOnly".into(),
            ),
        ]
    }

    #[test]
    fn menu_groups_by_account_with_running_index() {
        let menu = render_role_menu(&pairs());
        assert_eq!(
            menu,
            "Account: 000000000001\n  1) Role-02\nAccount: 111111111111\n  2) Admin\n  3) ReadOnly\n"
        );
    }

    #[test]
    fn single_option_is_auto_selected_without_prompt() {
        let pairs = pairs()[..1].to_vec();
        let ui = ScriptedUi { reply: None };
        let selected = select_role(&pairs, &ui).unwrap();
        assert_eq!(selected.role_name(), "Role-02");
    }

    #[test]
    fn numeric_choice_selects_the_indexed_role() {
        let pairs = pairs();
        let ui = ScriptedUi { reply: Some("3") };
        let selected = select_role(&pairs, &ui).unwrap();
        assert_eq!(selected.role_name(), "ReadOnly");
    }

    #[test]
    fn zero_is_out_of_range() {
        let err = parse_selection("0", 3).unwrap_err();
        assert!(matches!(err, AuthError::InvalidSelection { max: 3, .. }));
    }

    #[test]
    fn past_the_end_is_out_of_range() {
        let err = parse_selection("4", 3).unwrap_err();
        assert!(matches!(err, AuthError::InvalidSelection { max: 3, .. }));
    }

    #[test]
    fn non_numeric_input_is_rejected() {
        assert!(parse_selection("two", 3).is_err());
        assert!(parse_selection("", 3).is_err());
        assert!(parse_selection("-1", 3).is_err());
    }

    #[test]
    fn selection_aborts_instead_of_retrying() {
        let pairs = pairs();
        let ui = ScriptedUi { reply: Some("nope") };
        let err = select_role(&pairs, &ui).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AuthError>(),
            Some(AuthError::InvalidSelection { .. })
        ));
    }
}
