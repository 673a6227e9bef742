use crate::{Critique, ReviewConfig};

/// Prompt templates for the reviewer
pub struct ReviewPrompts;

impl ReviewPrompts {
    /// Build the review prompt. The theme is always the one the run started
    /// with, so scores stay comparable between epochs.
    pub fn build_review_prompt(theme: &str, candidate: &str, config: &ReviewConfig) -> String {
        let max = config.scale.max();
        let example = Self::example_critique(config).to_markup();

        format!(
            r#"<reviewer_prompt>
You are a demanding literary editor. Judge how well the book below delivers on the requested theme, and say precisely what would make the next draft better.

## Theme
{theme}

## Book
{candidate}

## Scoring
- Give an overall score from 0 to {max}. Scores must be whole numbers.
- Score each category from 0 to {max}: {categories}
- Rate each aspect from 0 to {max} and explain the rating in one or two sentences: {aspects}
- Reserve scores near {max} for work you would publish unchanged.

## Required Response Format

You may explain your reasoning first. End your response with exactly one review block, containing only JSON:

{example}
</reviewer_prompt>"#,
            theme = theme,
            candidate = candidate,
            max = max,
            categories = config.categories.join(", "),
            aspects = config.aspects.join(", "),
            example = example,
        )
    }

    fn example_critique(config: &ReviewConfig) -> Critique {
        let max = config.scale.max();
        let mut critique = Critique::new(max * 3 / 4);
        for name in &config.categories {
            critique = critique.with_category(name.as_str(), max * 3 / 4);
        }
        for name in &config.aspects {
            critique = critique.with_aspect(name.as_str(), max / 2, "What works, what does not, and how to fix it");
        }
        critique
    }
}
