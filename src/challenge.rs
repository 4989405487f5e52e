use std::fmt;

use rand::{rngs::StdRng, Rng, SeedableRng};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Add,
    Subtract,
}

/// One arithmetic problem. Operands are drawn from 1..=50; subtraction
/// operands are ordered so the answer is never negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Problem {
    lhs: i64,
    rhs: i64,
    operator: Operator,
}

impl Problem {
    fn generate(rng: &mut StdRng) -> Self {
        let mut lhs = rng.gen_range(1..=50);
        let mut rhs = rng.gen_range(1..=50);
        let operator = if rng.gen_bool(0.5) {
            Operator::Add
        } else {
            Operator::Subtract
        };
        if operator == Operator::Subtract && lhs < rhs {
            std::mem::swap(&mut lhs, &mut rhs);
        }
        Self { lhs, rhs, operator }
    }

    #[must_use]
    pub const fn answer(&self) -> i64 {
        match self.operator {
            Operator::Add => self.lhs + self.rhs,
            Operator::Subtract => self.lhs - self.rhs,
        }
    }
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self.operator {
            Operator::Add => '+',
            Operator::Subtract => '-',
        };
        write!(f, "{} {symbol} {} = ?", self.lhs, self.rhs)
    }
}

/// What grading one answer did to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grade {
    /// That was the last required answer; the session is done.
    Complete,
    /// Right answer, more to go.
    Correct,
    /// Wrong answer. Progress stays where it was, only the problem changes.
    Incorrect,
}

/// Tracks progress towards the N correct answers an alarm demands.
///
/// Every graded answer, right or wrong, gets a freshly generated problem, so
/// retrying the same sum isn't possible. Progress never goes backwards; a
/// wrong answer just fails to advance it.
#[derive(Debug)]
pub struct ChallengeSession {
    required: u32,
    correct: u32,
    fails: u32,
    problem: Problem,
    rng: StdRng,
}

impl ChallengeSession {
    #[must_use]
    pub fn new(required: u32) -> Self {
        Self::with_rng(required, StdRng::from_entropy())
    }

    /// Seedable constructor so tests can pick the problems.
    #[must_use]
    pub fn with_rng(required: u32, mut rng: StdRng) -> Self {
        let problem = Problem::generate(&mut rng);
        Self {
            // zero required answers would dismiss instantly
            required: required.max(1),
            correct: 0,
            fails: 0,
            problem,
            rng,
        }
    }

    /// Grades an answer and moves to a new problem.
    pub fn submit(&mut self, answer: i64) -> Grade {
        if self.is_complete() {
            return Grade::Complete;
        }
        let grade = if answer == self.problem.answer() {
            self.correct += 1;
            if self.is_complete() {
                return Grade::Complete;
            }
            Grade::Correct
        } else {
            self.fails += 1;
            Grade::Incorrect
        };
        self.problem = Problem::generate(&mut self.rng);
        grade
    }

    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.correct >= self.required
    }

    #[must_use]
    pub const fn problem(&self) -> &Problem {
        &self.problem
    }

    #[must_use]
    pub const fn correct_so_far(&self) -> u32 {
        self.correct
    }

    #[must_use]
    pub const fn required(&self) -> u32 {
        self.required
    }

    #[must_use]
    pub const fn fails(&self) -> u32 {
        self.fails
    }
}
