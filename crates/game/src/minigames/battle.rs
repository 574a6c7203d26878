use std::time::Duration;

use escape_engine::{MinigameInput, SurfaceTint};
use rand::Rng;

use super::session::{SessionContext, Waited};

pub(super) const NAME: &str = "Pokemon Battle: Students vs Pianini";
pub(super) const DESCRIPTION: &str = "Epic Pokemon-style battle between Students and Professors!";

const MOVES_PER_FIGHTER: usize = 4;
const ROLL_MIN_PERCENT: u32 = 90;
const ROLL_MAX_PERCENT: u32 = 110;
const TURN_PAUSE: Duration = Duration::from_millis(1500);
const FINISH_PAUSE: Duration = Duration::from_secs(3);
const INPUT_WAIT: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct Technique {
    pub(super) name: &'static str,
    pub(super) power: u32,
}

const fn technique(name: &'static str, power: u32) -> Technique {
    Technique { name, power }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct FighterSpec {
    pub(super) name: &'static str,
    pub(super) max_hp: u32,
    pub(super) attack: u32,
    pub(super) defense: u32,
    pub(super) techniques: [Technique; MOVES_PER_FIGHTER],
}

pub(super) const STUDENT_TEAM: [FighterSpec; 3] = [
    FighterSpec {
        name: "Studente Informatico",
        max_hp: 120,
        attack: 85,
        defense: 70,
        techniques: [
            technique("Cramming", 25),
            technique("Coffee Rush", 20),
            technique("Group Study", 15),
            technique("All-Nighter", 35),
        ],
    },
    FighterSpec {
        name: "Studente Magistrale",
        max_hp: 140,
        attack: 90,
        defense: 85,
        techniques: [
            technique("Code Debug", 30),
            technique("Stack Overflow", 40),
            technique("Git Commit", 25),
            technique("Compiler Error", 20),
        ],
    },
    FighterSpec {
        name: "Studente Laureando",
        max_hp: 160,
        attack: 95,
        defense: 90,
        techniques: [
            technique("Thesis Defense", 45),
            technique("Research Paper", 35),
            technique("Internship", 25),
            technique("Graduation", 50),
        ],
    },
];

pub(super) const PROFESSOR_TEAM: [FighterSpec; 3] = [
    FighterSpec {
        name: "Professor Pianini Jr.",
        max_hp: 130,
        attack: 80,
        defense: 95,
        techniques: [
            technique("Pop Quiz", 30),
            technique("Homework Bomb", 25),
            technique("Lecture Drone", 20),
            technique("Attendance Check", 35),
        ],
    },
    FighterSpec {
        name: "Professor Pianini Sr.",
        max_hp: 150,
        attack: 100,
        defense: 100,
        techniques: [
            technique("Theoretical Proof", 40),
            technique("Academic Bureaucracy", 30),
            technique("Peer Review", 35),
            technique("Conference Paper", 45),
        ],
    },
    FighterSpec {
        name: "Professor Pianini Master",
        max_hp: 180,
        attack: 110,
        defense: 120,
        techniques: [
            technique("Final Exam", 55),
            technique("Grade Curve", 40),
            technique("Department Meeting", 30),
            technique("Tenure Track", 60),
        ],
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Fighter {
    spec: FighterSpec,
    hp: u32,
}

impl Fighter {
    fn new(spec: FighterSpec) -> Self {
        Self {
            spec,
            hp: spec.max_hp,
        }
    }

    fn is_fainted(&self) -> bool {
        self.hp == 0
    }

    /// Raw damage for `technique`, scaled by a roll in percent.
    fn strike_power(&self, technique: Technique, roll_percent: u32) -> u32 {
        (technique.power + self.spec.attack / 4) * roll_percent / 100
    }

    /// Defense absorbs a third of its value; every hit lands at least 1.
    fn take_damage(&mut self, raw: u32) -> u32 {
        let dealt = raw.saturating_sub(self.spec.defense / 3).max(1);
        self.hp = self.hp.saturating_sub(dealt);
        dealt
    }

    fn status(&self) -> String {
        format!("{} {}/{} HP", self.spec.name, self.hp, self.spec.max_hp)
    }
}

#[derive(Debug, Clone)]
struct Team {
    fighters: Vec<Fighter>,
    active: usize,
}

impl Team {
    fn new(specs: &[FighterSpec]) -> Self {
        Self {
            fighters: specs.iter().copied().map(Fighter::new).collect(),
            active: 0,
        }
    }

    fn active(&self) -> Option<&Fighter> {
        self.fighters.get(self.active)
    }

    fn active_mut(&mut self) -> Option<&mut Fighter> {
        self.fighters.get_mut(self.active)
    }

    /// Sends in the next fighter, returning its name, or `None` once the
    /// whole team is down.
    fn send_next(&mut self) -> Option<&'static str> {
        self.active += 1;
        self.active().map(|fighter| fighter.spec.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum BattleOutcome {
    Won,
    Lost,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Turn {
    Player,
    Opponent,
    Over(BattleOutcome),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct Strike {
    pub(super) attacker: &'static str,
    pub(super) defender: &'static str,
    pub(super) technique: &'static str,
    pub(super) damage: u32,
    pub(super) knocked_out: bool,
    pub(super) replacement: Option<&'static str>,
}

impl Strike {
    fn message(&self) -> String {
        let mut message = format!(
            "{} uses {}! {} damage.",
            self.attacker, self.technique, self.damage
        );
        if self.knocked_out {
            message.push_str(&format!(" {} fainted!", self.defender));
        }
        if let Some(next) = self.replacement {
            message.push_str(&format!(" Go! {next}!"));
        }
        message
    }
}

/// Students against professors, one fighter out per side. The player
/// picks student moves; knocking out a fighter hands the turn back to the
/// player.
#[derive(Debug, Clone)]
pub(super) struct Battle {
    students: Team,
    professors: Team,
    selected: usize,
    turn: Turn,
}

impl Battle {
    pub(super) fn new() -> Self {
        Self::with_teams(&STUDENT_TEAM, &PROFESSOR_TEAM)
    }

    pub(super) fn with_teams(students: &[FighterSpec], professors: &[FighterSpec]) -> Self {
        let mut battle = Self {
            students: Team::new(students),
            professors: Team::new(professors),
            selected: 0,
            turn: Turn::Player,
        };
        if battle.students.active().is_none() {
            battle.turn = Turn::Over(BattleOutcome::Lost);
        } else if battle.professors.active().is_none() {
            battle.turn = Turn::Over(BattleOutcome::Won);
        }
        battle
    }

    pub(super) fn turn(&self) -> Turn {
        self.turn
    }

    pub(super) fn selected(&self) -> usize {
        self.selected
    }

    pub(super) fn move_labels(&self) -> Vec<String> {
        self.students
            .active()
            .map(|fighter| {
                fighter
                    .spec
                    .techniques
                    .iter()
                    .map(|technique| format!("{} ({})", technique.name, technique.power))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub(super) fn status_line(&self) -> String {
        match (self.students.active(), self.professors.active()) {
            (Some(student), Some(professor)) => {
                format!("{} vs {}", student.status(), professor.status())
            }
            _ => String::new(),
        }
    }

    pub(super) fn move_selection(&mut self, input: MinigameInput) {
        self.selected = match input {
            MinigameInput::Up | MinigameInput::Left => {
                (self.selected + MOVES_PER_FIGHTER - 1) % MOVES_PER_FIGHTER
            }
            MinigameInput::Down | MinigameInput::Right => (self.selected + 1) % MOVES_PER_FIGHTER,
            MinigameInput::Confirm => self.selected,
        };
    }

    /// Uses the highlighted student move. Ignored outside the player's turn.
    pub(super) fn player_attack(&mut self, roll_percent: u32) -> Option<Strike> {
        if self.turn != Turn::Player {
            return None;
        }
        let selected = self.selected;
        let strike = exchange(&self.students, &mut self.professors, selected, roll_percent)?;
        self.turn = match (strike.knocked_out, strike.replacement) {
            (false, _) => Turn::Opponent,
            (true, Some(_)) => Turn::Player,
            (true, None) => Turn::Over(BattleOutcome::Won),
        };
        Some(strike)
    }

    /// Professor answers with the move at `technique`. Ignored outside the
    /// opponent's turn.
    pub(super) fn opponent_attack(&mut self, technique: usize, roll_percent: u32) -> Option<Strike> {
        if self.turn != Turn::Opponent {
            return None;
        }
        let strike = exchange(&self.professors, &mut self.students, technique, roll_percent)?;
        if strike.replacement.is_some() {
            self.selected = 0;
        }
        self.turn = match (strike.knocked_out, strike.replacement) {
            (true, None) => Turn::Over(BattleOutcome::Lost),
            _ => Turn::Player,
        };
        Some(strike)
    }
}

fn exchange(
    attackers: &Team,
    defenders: &mut Team,
    technique: usize,
    roll_percent: u32,
) -> Option<Strike> {
    let attacker = attackers.active()?;
    let technique = *attacker.spec.techniques.get(technique)?;
    let raw = attacker.strike_power(technique, roll_percent);
    let defender = defenders.active_mut()?;
    let damage = defender.take_damage(raw);
    let knocked_out = defender.is_fainted();
    let defender_name = defender.spec.name;
    let replacement = if knocked_out {
        defenders.send_next()
    } else {
        None
    };
    Some(Strike {
        attacker: attacker.spec.name,
        defender: defender_name,
        technique: technique.name,
        damage,
        knocked_out,
        replacement,
    })
}

pub(super) fn damage_roll<R: Rng + ?Sized>(rng: &mut R) -> u32 {
    rng.random_range(ROLL_MIN_PERCENT..=ROLL_MAX_PERCENT)
}

pub(super) fn run(context: &SessionContext) -> bool {
    let surface = context.surface();
    let mut rng = rand::rng();
    let mut battle = Battle::new();
    surface.set_tint(SurfaceTint::Neutral);
    surface.set_options(Vec::new(), None);
    surface.set_prompt("Professor Pianini challenges you to a battle!");
    if !context.pause(TURN_PAUSE) {
        return false;
    }

    loop {
        let strike = match battle.turn() {
            Turn::Over(outcome) => {
                surface.set_options(Vec::new(), None);
                let won = outcome == BattleOutcome::Won;
                if won {
                    surface.set_tint(SurfaceTint::Success);
                    surface.set_prompt("Victory! You defeated Professor Pianini!");
                } else {
                    surface.set_tint(SurfaceTint::Failure);
                    surface.set_prompt("Defeat. Professor Pianini was too strong...");
                }
                return context.pause(FINISH_PAUSE) && won;
            }
            Turn::Player => {
                surface.set_tint(SurfaceTint::Neutral);
                surface.set_prompt(battle.status_line());
                surface.set_options(battle.move_labels(), Some(battle.selected()));
                let strike = loop {
                    match context.wait_for_input(INPUT_WAIT) {
                        Waited::Input(MinigameInput::Confirm) => {
                            break battle.player_attack(damage_roll(&mut rng))
                        }
                        Waited::Input(direction) => {
                            battle.move_selection(direction);
                            surface.set_selected(Some(battle.selected()));
                        }
                        Waited::Elapsed => {}
                        Waited::Aborted => return false,
                    }
                };
                surface.set_tint(SurfaceTint::Success);
                strike
            }
            Turn::Opponent => {
                let technique = rng.random_range(0..MOVES_PER_FIGHTER);
                surface.set_tint(SurfaceTint::Failure);
                battle.opponent_attack(technique, damage_roll(&mut rng))
            }
        };

        if let Some(strike) = strike {
            surface.set_options(Vec::new(), None);
            surface.set_prompt(strike.message());
            if !context.pause(TURN_PAUSE) {
                return false;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const EVEN_ROLL: u32 = 100;

    fn fragile(name: &'static str, max_hp: u32) -> FighterSpec {
        FighterSpec {
            name,
            max_hp,
            attack: 0,
            defense: 0,
            techniques: [technique("Poke", 5); MOVES_PER_FIGHTER],
        }
    }

    #[test]
    fn player_strike_applies_attack_and_defense() {
        let mut battle = Battle::new();

        let strike = battle.player_attack(EVEN_ROLL).expect("player turn");

        // Cramming 25 + 85 / 4 = 46 raw, minus 95 / 3 = 31 defense.
        assert_eq!(strike.technique, "Cramming");
        assert_eq!(strike.damage, 15);
        assert!(!strike.knocked_out);
        assert_eq!(battle.professors.active().map(|f| f.hp), Some(115));
        assert_eq!(battle.turn(), Turn::Opponent);
    }

    #[test]
    fn opponent_answers_and_hands_turn_back() {
        let mut battle = Battle::new();
        assert!(battle.opponent_attack(0, EVEN_ROLL).is_none());
        battle.player_attack(EVEN_ROLL);

        let strike = battle.opponent_attack(0, EVEN_ROLL).expect("opponent turn");

        // Pop Quiz 30 + 80 / 4 = 50 raw, minus 70 / 3 = 23 defense.
        assert_eq!(strike.attacker, "Professor Pianini Jr.");
        assert_eq!(strike.damage, 27);
        assert_eq!(battle.students.active().map(|f| f.hp), Some(93));
        assert_eq!(battle.turn(), Turn::Player);
    }

    #[test]
    fn every_hit_lands_at_least_one_point() {
        let mut wall = Fighter::new(FighterSpec {
            defense: 300,
            ..fragile("Wall", 10)
        });

        assert_eq!(wall.take_damage(5), 1);
        assert_eq!(wall.hp, 9);
    }

    #[test]
    fn knockout_sends_next_professor_and_keeps_player_turn() {
        let mut battle =
            Battle::with_teams(&STUDENT_TEAM[..1], &[fragile("Tutor", 1), fragile("Dean", 50)]);

        let strike = battle.player_attack(EVEN_ROLL).expect("player turn");

        assert!(strike.knocked_out);
        assert_eq!(strike.replacement, Some("Dean"));
        assert_eq!(battle.turn(), Turn::Player);
        assert!(battle.status_line().ends_with("Dean 50/50 HP"));
    }

    #[test]
    fn last_professor_down_wins_and_freezes_battle() {
        let mut battle = Battle::with_teams(&STUDENT_TEAM[..1], &[fragile("Tutor", 1)]);

        battle.player_attack(EVEN_ROLL);

        assert_eq!(battle.turn(), Turn::Over(BattleOutcome::Won));
        assert!(battle.player_attack(EVEN_ROLL).is_none());
        assert!(battle.opponent_attack(0, EVEN_ROLL).is_none());
    }

    #[test]
    fn losing_the_last_student_loses() {
        let mut battle = Battle::with_teams(&[fragile("Freshman", 1)], &PROFESSOR_TEAM[..1]);

        battle.player_attack(EVEN_ROLL);
        let strike = battle.opponent_attack(3, EVEN_ROLL).expect("opponent turn");

        assert!(strike.knocked_out);
        assert_eq!(strike.replacement, None);
        assert_eq!(battle.turn(), Turn::Over(BattleOutcome::Lost));
    }

    #[test]
    fn fresh_student_starts_on_first_move() {
        let mut battle = Battle::with_teams(
            &[fragile("Freshman", 1), STUDENT_TEAM[0]],
            &PROFESSOR_TEAM[..1],
        );
        battle.move_selection(MinigameInput::Up);
        assert_eq!(battle.selected(), 3);
        battle.player_attack(EVEN_ROLL);

        let strike = battle.opponent_attack(0, EVEN_ROLL).expect("opponent turn");

        assert_eq!(strike.replacement, Some("Studente Informatico"));
        assert_eq!(battle.selected(), 0);
        assert_eq!(battle.move_labels()[0], "Cramming (25)");
    }

    #[test]
    fn damage_roll_stays_within_ten_percent() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..200 {
            let roll = damage_roll(&mut rng);
            assert!((ROLL_MIN_PERCENT..=ROLL_MAX_PERCENT).contains(&roll));
        }
    }

    #[test]
    fn strike_message_announces_replacement() {
        let strike = Strike {
            attacker: "Studente Informatico",
            defender: "Professor Pianini Jr.",
            technique: "All-Nighter",
            damage: 20,
            knocked_out: true,
            replacement: Some("Professor Pianini Sr."),
        };

        assert_eq!(
            strike.message(),
            "Studente Informatico uses All-Nighter! 20 damage. \
             Professor Pianini Jr. fainted! Go! Professor Pianini Sr.!"
        );
    }
}
