use copilot_core::guidance::extractor::{DEFAULT_ADDRESSED_HEADER, DEFAULT_UNADDRESSED_HEADER};
use copilot_core::recommendation::WAITING_SENTINEL;

pub fn guidance_prompt(transcript: &str, question_template: &str) -> String {
    format!(
        "You are assisting a financial advisor during a live client conversation.\n\
         Compare the transcript with the discovery questions below.\n\n\
         Respond with exactly two sections. Under the heading \"{DEFAULT_ADDRESSED_HEADER}\" \
         list every question the client has already answered, one per line, formatted as \
         \"<number>. <question> - <answer>\". Under the heading \"{DEFAULT_UNADDRESSED_HEADER}\" \
         list every question that is still open, one per line, formatted as \
         \"<number>. <question>\".\n\n\
         Discovery questions:\n{question_template}\n\n\
         Transcript:\n{transcript}\n"
    )
}

pub fn recommendation_prompt(transcript: &str) -> String {
    format!(
        "You are assisting a financial advisor during a live client conversation.\n\
         Based on the transcript, suggest one concise investment recommendation for the client.\n\
         Use the word \"urgent\", \"immediate\" or \"critical\" only when action is time sensitive.\n\
         If the transcript does not yet contain enough information about the client's goals, \
         horizon and risk tolerance, reply with exactly \"{WAITING_SENTINEL}\" and nothing else.\n\n\
         Transcript:\n{transcript}\n"
    )
}
