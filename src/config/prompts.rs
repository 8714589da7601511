//! Prompt templates for STUD.
//!
//! Prompts can be customized by placing TOML files in the custom prompts directory.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Prompts {
    pub tutor: TutorPrompts,
    pub quiz: QuizPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: std::collections::HashMap<String, String>,
}

/// Prompts for the RAG tutor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TutorPrompts {
    pub system: String,
    /// Closing instructions appended after the current question.
    pub instructions: String,
}

impl Default for TutorPrompts {
    fn default() -> Self {
        Self {
            system: r#"You are an expert AI tutor helping students learn from video content.

CRITICAL GUIDELINES:
1. Answer questions ONLY based on the provided video transcript chunks
2. DO NOT introduce external knowledge or information not in the transcripts
3. If the transcripts don't contain enough information, say so clearly
4. Always cite specific parts of the transcript in your answer
5. Use timestamps when referring to specific content (e.g., "At 2:15, the video explains...")
6. Keep answers clear, concise, and educational
7. Use a friendly, encouraging teaching tone
8. If the question is unclear, ask for clarification
9. Break down complex topics into simpler explanations
10. Provide examples from the video when possible

FORMAT YOUR ANSWERS:
- Start with a direct answer
- Explain with references to the video content
- Use timestamps for specific references
- End with encouragement or related insight

Remember: You are teaching based on video content. Stay true to the source material."#
                .to_string(),

            instructions: r#"Please answer the student's question based on the video content above. Remember to:
- Reference specific parts of the transcript
- Use timestamps when appropriate
- Only use information from the provided content
- Be clear if information is insufficient"#
                .to_string(),
        }
    }
}

/// Prompts for quiz generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QuizPrompts {
    pub system: String,
    pub user: String,
}

impl Default for QuizPrompts {
    fn default() -> Self {
        Self {
            system: "You are an expert educational content creator specializing in quiz generation from video transcripts. You follow strict guidelines to ensure factual accuracy.".to_string(),

            user: r#"You are an expert educational quiz generator. Generate {{num_questions}} multiple-choice questions based ONLY on the following video transcript.

CRITICAL REQUIREMENTS:
1. Generate questions EXCLUSIVELY from the transcript content below
2. DO NOT add external facts, common knowledge, or assumptions
3. Each question must be directly answerable from the transcript
4. Provide 4 options (A, B, C, D) with exactly ONE correct answer
5. Incorrect options should be plausible but clearly wrong based on the transcript
6. Include a brief explanation citing the specific transcript segment
7. {{difficulty_rule}}
8. Set requires_review to true if you're uncertain about factual accuracy

TRANSCRIPT:
{{transcript}}

Generate {{num_questions}} questions in the following JSON format:
{
  "questions": [
    {
      "question": "What concept is explained in the video?",
      "options": ["Option A", "Option B", "Option C", "Option D"],
      "correct_index": 0,
      "explanation": "The video states at 15s that...",
      "difficulty": "beginner",
      "requires_review": false,
      "timestamp_reference": 15.0
    }
  ]
}

IMPORTANT: Return ONLY valid JSON. No additional text or markdown formatting."#
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&std::collections::HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let tutor_path = custom_path.join("tutor.toml");
            if tutor_path.exists() {
                let content = std::fs::read_to_string(&tutor_path)?;
                prompts.tutor = toml::from_str(&content)?;
            }

            let quiz_path = custom_path.join("quiz.toml");
            if quiz_path.exists() {
                let content = std::fs::read_to_string(&quiz_path)?;
                prompts.quiz = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    pub fn render(template: &str, vars: &std::collections::HashMap<String, String>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(
        &self,
        template: &str,
        vars: &std::collections::HashMap<String, String>,
    ) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }
}
