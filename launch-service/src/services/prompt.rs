//! The fixed launch-framework prompt.
//!
//! The model is asked to fill an HTML skeleton in place and return only the
//! markup, which the status path later trims with `clean_content`.

const PREAMBLE: &str = "You are a startup strategist with extensive experience in launching successful businesses. Your task is to provide a comprehensive launch framework for a 48-hour startup with no capital.";

const INSTRUCTIONS: &str = "IMPORTANT: Return ONLY the HTML content below, with no additional text, markdown, or explanations. Do not include any text before or after the HTML. Do not use markdown code blocks or any other formatting.";

/// Section skeleton with bracketed placeholders for the model to fill.
const SKELETON: &str = r#"<div class="bg-white rounded-xl shadow-md p-6 mb-6">
  <h2 class="text-xl font-bold text-blue-700 mb-4">Strategy Summary</h2>
  <div class="space-y-4">
    <p class="text-gray-700 leading-relaxed">
      [Provide a detailed overview of the business strategy, including:]
    </p>
    <ul class="list-disc list-inside space-y-2 text-gray-700">
      <li>Target market analysis and ideal customer profile</li>
      <li>Unique value proposition and competitive advantage</li>
      <li>Key success metrics and goals for the 48-hour launch</li>
      <li>Potential challenges and risk mitigation strategies</li>
    </ul>
  </div>
</div>

<div class="bg-white rounded-xl shadow-md p-6 mb-6">
  <h2 class="text-xl font-bold text-blue-700 mb-4">Step-by-Step Launch Plan</h2>
  <div class="space-y-6">
    <ol class="list-decimal list-inside space-y-4">
      <li class="text-gray-700">
        <span class="font-semibold">[Step Title]</span>
        <p class="ml-6 mt-2">[Detailed explanation of the step]</p>
        <div class="ml-6 mt-2 bg-gray-50 p-3 rounded-lg">
          <p class="text-sm text-gray-600">Example: [Provide a specific example of how to execute this step]</p>
        </div>
      </li>
      [Continue with detailed steps]
    </ol>
  </div>
</div>

<div class="bg-white rounded-xl shadow-md p-6 mb-6">
  <h2 class="text-xl font-bold text-blue-700 mb-4">Recommended Tools & Resources</h2>
  <div class="space-y-4">
    <div class="grid grid-cols-1 md:grid-cols-2 gap-4">
      <div class="bg-gray-50 rounded-lg p-4 border border-gray-200">
        <h3 class="font-semibold text-gray-800 mb-2">[Tool Category]</h3>
        <ul class="list-disc list-inside space-y-2 text-gray-700">
          <li>
            <span class="font-medium">[Tool Name]</span>
            <p class="text-sm text-gray-600">[Detailed explanation of how to use this tool]</p>
          </li>
        </ul>
      </div>
    </div>
  </div>
</div>

<div class="bg-white rounded-xl shadow-md p-6 mb-6">
  <h2 class="text-xl font-bold text-blue-700 mb-4">Sales & Marketing Channels</h2>
  <div class="space-y-6">
    <div class="grid grid-cols-1 md:grid-cols-2 gap-4">
      <div class="bg-gray-50 rounded-lg p-4 border border-gray-200">
        <h3 class="font-semibold text-gray-800 mb-2">[Channel Name]</h3>
        <div class="space-y-3">
          <p class="text-gray-700">[Detailed strategy for this channel]</p>
          <div class="bg-white p-3 rounded-lg">
            <p class="text-sm text-gray-600">Implementation Steps:</p>
            <ol class="list-decimal list-inside text-sm text-gray-600 mt-2">
              <li>[Step 1]</li>
              <li>[Step 2]</li>
            </ol>
          </div>
        </div>
      </div>
    </div>
  </div>
</div>

<div class="bg-white rounded-xl shadow-md p-6 mb-6">
  <h2 class="text-xl font-bold text-blue-700 mb-4">Monetization Strategy</h2>
  <div class="space-y-4">
    <div class="bg-gray-50 rounded-lg p-4 border border-gray-200">
      <h3 class="font-semibold text-gray-800 mb-2">[Strategy Name]</h3>
      <div class="space-y-3">
        <p class="text-gray-700">[Detailed explanation of the monetization strategy]</p>
        <div class="bg-white p-3 rounded-lg">
          <p class="text-sm text-gray-600">Implementation Guide:</p>
          <ul class="list-disc list-inside text-sm text-gray-600 mt-2">
            <li>[Step 1]</li>
            <li>[Step 2]</li>
          </ul>
        </div>
        <div class="bg-blue-50 p-3 rounded-lg">
          <p class="text-sm text-blue-600">Pro Tip: [Share a valuable insight or best practice]</p>
        </div>
      </div>
    </div>
  </div>
</div>

<div class="bg-white rounded-xl shadow-md p-6 mb-6">
  <h2 class="text-xl font-bold text-blue-700 mb-4">Success Metrics & Tracking</h2>
  <div class="space-y-4">
    <div class="grid grid-cols-1 md:grid-cols-2 gap-4">
      <div class="bg-gray-50 rounded-lg p-4 border border-gray-200">
        <h3 class="font-semibold text-gray-800 mb-2">[Metric Name]</h3>
        <p class="text-gray-700">[How to measure and track this metric]</p>
        <p class="text-sm text-gray-600 mt-2">Target: [Specific target value]</p>
      </div>
    </div>
  </div>
</div>"#;

/// Build the full prompt for one idea.
pub fn build_prompt(idea: &str) -> String {
    format!(
        "{}\n\nProduct/Service: \"{}\"\n\n{}\n\n{}",
        PREAMBLE,
        idea.trim(),
        INSTRUCTIONS,
        SKELETON
    )
}
